//! Paper and user metadata from the ConfTool conference management service.

mod cache;
mod client;
mod mapper;

use serde::Serialize;
use thiserror::Error;

pub use cache::CachedLookup;
pub use client::{ConfToolClient, ExportType};
pub use mapper::{paper_list, user_details};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Paper {
    pub paper_id: i64,
    pub title: String,
    /// One `"Name (Affiliation)"` entry per author, in byline order.
    pub authors_and_affiliations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            first_name: None,
            last_name: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("conftool request failed: {0}")]
    Io(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("paper {0} not found")]
    PaperNotFound(i64),

    #[error("unexpected conftool response: {0}")]
    Response(String),
}

pub type Result<T> = std::result::Result<T, LookupError>;

/// Source of paper metadata for a conversion. Passed explicitly to every conversion.
pub trait PaperLookup {
    fn papers(&self, user: &User) -> Result<Vec<Paper>>;

    fn paper(&self, user: &User, paper_id: i64) -> Result<Paper> {
        self.papers(user)?
            .into_iter()
            .find(|p| p.paper_id == paper_id)
            .ok_or(LookupError::PaperNotFound(paper_id))
    }

    /// `user` with first and last name filled in where the service knows them.
    fn detailed_user(&self, user: &User) -> Result<User>;
}
