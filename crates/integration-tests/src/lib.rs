//! Shared fixtures for the integration suites: canonical principals and a
//! service wired to the in-memory adapters, with the raw store handles
//! kept around so tests can assert on persisted state directly.

use std::sync::Arc;

use domains::{Principal, UserType};
use services::{AccessPolicy, EngagementEngine, SuggestionService};
use storage_adapters::{MemoryAuditLog, MemorySuggestionStore};

pub fn student(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        roles: vec!["student".into()],
        user_type: UserType::Student,
    }
}

pub fn teacher(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        roles: vec!["teacher".into()],
        user_type: UserType::Teacher,
    }
}

pub fn admin(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        roles: vec!["teacher".into(), "admin".into()],
        user_type: UserType::Teacher,
    }
}

pub struct Harness {
    pub store: Arc<MemorySuggestionStore>,
    pub audit: Arc<MemoryAuditLog>,
    pub service: Arc<SuggestionService>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemorySuggestionStore::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let service = Arc::new(SuggestionService::new(
        store.clone(),
        audit.clone(),
        EngagementEngine::default(),
        AccessPolicy::default(),
    ));
    Harness {
        store,
        audit,
        service,
    }
}
