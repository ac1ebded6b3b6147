//! Session-scoped state.
//!
//! A [`Session`] is the context object that owns one upload's
//! [`RosterStore`]; every component call receives the store through it.
//! [`SessionRegistry`] keeps the live sessions of the HTTP server.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::pipeline::{LoadedRoster, SourceInfo};
use crate::roster::RosterStore;

/// One upload and its roster.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    /// Uploaded file name, if known.
    pub source_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub source: SourceInfo,
    pub roster: RosterStore,
}

impl Session {
    pub fn new(loaded: LoadedRoster, source_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_name,
            created_at: Utc::now(),
            source: loaded.source,
            roster: loaded.roster,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.to_string(),
            file_name: self.source_name.clone(),
            created_at: self.created_at.to_rfc3339(),
            row_count: self.roster.len(),
            classes: self.roster.list_classes(),
            source: self.source.clone(),
        }
    }

    /// Fail unless `class_id` has at least one record.
    pub fn require_class(&self, class_id: &str) -> SessionResult<()> {
        if self.roster.class_roster(class_id).is_empty() {
            Err(SessionError::UnknownClass(class_id.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Public description of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub file_name: Option<String>,
    pub created_at: String,
    pub row_count: usize,
    pub classes: Vec<String>,
    pub source: SourceInfo,
}

/// Live sessions keyed by id.
///
/// Each session is independent; the lock only serializes access to the map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new session and return its summary.
    pub async fn insert(&self, session: Session) -> SessionSummary {
        let summary = session.summary();
        self.sessions.lock().await.insert(session.id, session);
        summary
    }

    /// Run `f` against a session.
    pub async fn with_session<T, F>(&self, id: &str, f: F) -> SessionResult<T>
    where
        F: FnOnce(&Session) -> T,
    {
        let key = parse_id(id)?;
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(&key)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(f(session))
    }

    /// Run `f` against a session with write access to its roster.
    pub async fn with_session_mut<T, F>(&self, id: &str, f: F) -> SessionResult<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let key = parse_id(id)?;
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(f(session))
    }

    /// Discard a session.
    pub async fn remove(&self, id: &str) -> SessionResult<()> {
        let key = parse_id(id)?;
        self.sessions
            .lock()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn parse_id(id: &str) -> SessionResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| SessionError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participation, StudentRecord};
    use crate::normalize::NormalizeReport;
    use crate::parser::SourceFormat;

    fn loaded() -> LoadedRoster {
        LoadedRoster {
            roster: RosterStore::new(vec![
                StudentRecord::new("1A", "1", "Amy"),
                StudentRecord::new("2B", "1", "Ben"),
            ]),
            source: SourceInfo {
                format: SourceFormat::Csv,
                sheet: None,
                encoding: Some("utf-8".into()),
                delimiter: Some(','),
                headers: vec!["班級".into(), "座號".into(), "姓名".into()],
                row_count: 2,
            },
            report: NormalizeReport::default(),
        }
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.insert(Session::new(loaded(), Some("a.csv".into()))).await;
        let b = registry.insert(Session::new(loaded(), None)).await;
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.classes, vec!["1A", "2B"]);

        registry
            .with_session_mut(&a.session_id, |s| {
                s.roster.apply_edit(0, Participation::NotJoining, None).map(|_| ())
            })
            .await
            .unwrap()
            .unwrap();

        let b_first = registry
            .with_session(&b.session_id, |s| s.roster.records()[0].participation)
            .await
            .unwrap();
        assert_eq!(b_first, Participation::Joining);
    }

    #[tokio::test]
    async fn test_unknown_and_removed_sessions() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.with_session("not-a-uuid", |_| ()).await,
            Err(SessionError::NotFound(_))
        ));

        let summary = registry.insert(Session::new(loaded(), None)).await;
        registry.remove(&summary.session_id).await.unwrap();
        assert_eq!(registry.len().await, 0);
        assert!(registry.remove(&summary.session_id).await.is_err());
    }

    #[test]
    fn test_require_class() {
        let session = Session::new(loaded(), None);
        assert!(session.require_class("1A").is_ok());
        assert!(matches!(
            session.require_class("3C"),
            Err(SessionError::UnknownClass(_))
        ));
    }
}
