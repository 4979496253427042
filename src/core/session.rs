//! Saved conversations, persisted as a single JSON document in the platform
//! data directory. The streaming core has no dependency on this format; it
//! only produces and consumes [`ChatMessage`] values in memory.

use chrono::Local;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::message::ChatMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub timestamp: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionBook {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_index: usize,
}

impl SessionBook {
    pub fn load() -> Result<SessionBook, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::get_data_path())
    }

    pub fn load_from_path(path: &PathBuf) -> Result<SessionBook, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let book: SessionBook = serde_json::from_str(&contents)?;
            Ok(book)
        } else {
            Ok(SessionBook::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to_path(&Self::get_data_path())
    }

    pub fn save_to_path(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn get_data_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "charla")
            .expect("Failed to determine data directory");
        proj_dirs.data_dir().join("sessions.json")
    }

    /// Append a fresh session and make it current.
    pub fn new_session(&mut self, model: &str) -> &mut Session {
        let session = Session {
            name: format!("Chat {}", self.sessions.len() + 1),
            timestamp: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            messages: Vec::new(),
            model: model.to_string(),
        };
        self.sessions.push(session);
        self.current_index = self.sessions.len() - 1;
        self.sessions
            .last_mut()
            .expect("a session was just pushed")
    }

    pub fn current(&self) -> Option<&Session> {
        self.sessions.get(self.current_index)
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.sessions.get_mut(self.current_index)
    }

    pub fn rename_current(&mut self, name: &str) {
        if let Some(session) = self.current_mut() {
            session.name = name.trim().to_string();
        }
    }

    pub fn delete_current(&mut self) {
        if self.current_index < self.sessions.len() {
            self.sessions.remove(self.current_index);
        }
        if self.current_index >= self.sessions.len() {
            self.current_index = self.sessions.len().saturating_sub(1);
        }
    }
}

/// Session title derived from the first message, truncated like a sidebar
/// entry.
pub fn preview_name(content: &str) -> String {
    let mut preview: String = content.chars().take(30).collect();
    if content.chars().count() > 30 {
        preview.push_str("...");
    }
    preview
}
