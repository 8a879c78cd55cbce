// Notifications - user-visible messages for every rejected action

use std::time::{SystemTime, UNIX_EPOCH};

use crate::audio::AudioError;
use crate::project::ProjectError;
use crate::sequencer::live::LiveError;
use crate::training::beat_map::BeatMapError;
use crate::training::compiler::CompileError;
use crate::training::session::SessionError;

/// Niveau de sévérité d'une notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Catégorie de notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    /// Edits refused to keep sections and figures consistent
    Structure,
    Import,
    Playback,
    Audio,
    Generic,
}

/// Notification avec timestamp et métadonnées
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    pub timestamp: u64, // Unix timestamp en millisecondes
}

/// Errors that know how they should be shown to the user
pub trait Notify: std::error::Error {
    fn category(&self) -> NotificationCategory;

    fn level(&self) -> NotificationLevel {
        NotificationLevel::Error
    }
}

impl Notification {
    /// Crée une nouvelle notification avec le timestamp actuel
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message,
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    /// Message for a rejected action
    pub fn from_error<E: Notify>(error: &E) -> Self {
        Self::new(error.level(), error.category(), error.to_string())
    }

    /// Vérifie si la notification est plus récente que N millisecondes
    pub fn is_recent(&self, max_age_ms: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        now.saturating_sub(self.timestamp) < max_age_ms
    }
}

impl Notify for BeatMapError {
    fn category(&self) -> NotificationCategory {
        match self {
            BeatMapError::ImportShape(_) | BeatMapError::MeterMismatch { .. } => {
                NotificationCategory::Import
            }
            _ => NotificationCategory::Structure,
        }
    }

    fn level(&self) -> NotificationLevel {
        NotificationLevel::Warning
    }
}

impl Notify for CompileError {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Playback
    }
}

impl Notify for SessionError {
    fn category(&self) -> NotificationCategory {
        match self {
            SessionError::PlaybackActive => NotificationCategory::Playback,
            SessionError::BeatMap(e) => e.category(),
            SessionError::Compile(e) => e.category(),
        }
    }

    fn level(&self) -> NotificationLevel {
        match self {
            SessionError::PlaybackActive => NotificationLevel::Warning,
            SessionError::BeatMap(e) => e.level(),
            SessionError::Compile(e) => e.level(),
        }
    }
}

impl Notify for LiveError {
    fn category(&self) -> NotificationCategory {
        match self {
            LiveError::Unimplemented(_) => NotificationCategory::Generic,
            _ => NotificationCategory::Structure,
        }
    }

    fn level(&self) -> NotificationLevel {
        match self {
            LiveError::Unimplemented(_) => NotificationLevel::Info,
            _ => NotificationLevel::Warning,
        }
    }
}

impl Notify for ProjectError {
    fn category(&self) -> NotificationCategory {
        match self {
            ProjectError::Session(e) => e.category(),
            _ => NotificationCategory::Import,
        }
    }
}

impl Notify for AudioError {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_creation() {
        let notif = Notification::error(NotificationCategory::Audio, "Test error".to_string());

        assert_eq!(notif.level, NotificationLevel::Error);
        assert_eq!(notif.category, NotificationCategory::Audio);
        assert_eq!(notif.message, "Test error");
        assert!(notif.timestamp > 0);
        assert!(notif.is_recent(10_000));
    }

    #[test]
    fn test_structural_rejection() {
        let notif = Notification::from_error(&BeatMapError::FigureCrossesBoundary(1));
        assert_eq!(notif.level, NotificationLevel::Warning);
        assert_eq!(notif.category, NotificationCategory::Structure);
        assert!(notif.message.contains("section 1"));
    }

    #[test]
    fn test_session_errors_keep_inner_category() {
        let wrapped = SessionError::BeatMap(BeatMapError::ImportShape("bad".into()));
        assert_eq!(
            Notification::from_error(&wrapped).category,
            NotificationCategory::Import
        );
        let active = Notification::from_error(&SessionError::PlaybackActive);
        assert_eq!(active.category, NotificationCategory::Playback);
    }

    #[test]
    fn test_unimplemented_is_info() {
        let notif = Notification::from_error(&LiveError::Unimplemented("tap tempo"));
        assert_eq!(notif.level, NotificationLevel::Info);
        assert_eq!(notif.message, "tap tempo is not implemented yet");
    }
}
