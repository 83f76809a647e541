//! Archive facade service.
//!
//! # Responsibility
//! - Provide the single API surface consumed by the command dispatcher.
//! - Validate caller input before any store mutation.
//! - Compose storage and relevance matching for search.
//!
//! # Invariants
//! - The facade performs no I/O beyond delegating to the repository.
//! - Search results keep store iteration order; relevance is pass/fail,
//!   never a ranked score.
//! - Results are plain structured data; user-facing text is built by the
//!   excluded dispatcher.

use crate::model::card::{Card, CardDraft, CardId, CardPatch, Section};
use crate::repo::archive_repo::{ArchiveRepository, RepoError};
use crate::search::relevance::{card_tokens, is_relevant, tokenize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Facade error for archive use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// A required field is blank.
    EmptyField(&'static str),
    /// A card patch carries no fields at all.
    EmptyPatch,
    /// A search query tokenized to no terms.
    EmptyQuery,
    /// Storage-layer failure, passed through typed.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "required field is empty: {field}"),
            Self::EmptyPatch => write!(f, "card patch contains no fields"),
            Self::EmptyQuery => write!(f, "search query contains no terms"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Archive facade over a repository implementation.
pub struct ArchiveService<R: ArchiveRepository> {
    repo: R,
}

impl<R: ArchiveRepository> ArchiveService<R> {
    /// Creates a facade using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one card. Title and content must be non-blank.
    pub fn new_card(
        &mut self,
        title: &str,
        desc: &str,
        content: &str,
        tags: &[String],
        author: Option<String>,
    ) -> ServiceResult<Card> {
        if title.trim().is_empty() {
            return Err(ServiceError::EmptyField("title"));
        }
        if content.trim().is_empty() {
            return Err(ServiceError::EmptyField("content"));
        }

        let draft = CardDraft::new(title, desc, content, tags, author);
        Ok(self.repo.create_card(&draft)?)
    }

    /// Applies a partial update. Only the supplied fields change.
    pub fn modify_card(
        &mut self,
        id: CardId,
        patch: &CardPatch,
        author: Option<&str>,
    ) -> ServiceResult<Card> {
        if patch.is_empty() {
            return Err(ServiceError::EmptyPatch);
        }
        if matches!(patch.title.as_deref(), Some(title) if title.trim().is_empty()) {
            return Err(ServiceError::EmptyField("title"));
        }
        Ok(self.repo.update_card(id, patch, author)?)
    }

    /// Deletes one card and its relations. Returns whether it existed.
    pub fn delete_card(&mut self, id: CardId) -> ServiceResult<bool> {
        Ok(self.repo.delete_card(id)?)
    }

    /// Gets one card by id.
    pub fn get_card(&self, id: CardId) -> ServiceResult<Option<Card>> {
        Ok(self.repo.get_card(id)?)
    }

    /// Batch card lookup preserving input order; missing ids yield `None`.
    pub fn get_cards(&self, ids: &[CardId]) -> ServiceResult<Vec<Option<Card>>> {
        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            cards.push(self.repo.get_card(*id)?);
        }
        Ok(cards)
    }

    /// Lists all cards in stable store order.
    pub fn cards(&self) -> ServiceResult<Vec<Card>> {
        Ok(self.repo.list_cards()?)
    }

    /// Creates one section.
    pub fn new_section(&mut self, name: &str) -> ServiceResult<()> {
        Ok(self.repo.create_section(name)?)
    }

    /// Deletes one section and its relations; cards stay.
    pub fn delete_section(&mut self, name: &str) -> ServiceResult<bool> {
        Ok(self.repo.delete_section(name)?)
    }

    /// Renames a section, keeping all its memberships.
    pub fn rename_section(&mut self, old: &str, new: &str) -> ServiceResult<()> {
        Ok(self.repo.rename_section(old, new)?)
    }

    /// Lists all sections.
    pub fn sections(&self) -> ServiceResult<Vec<Section>> {
        Ok(self.repo.list_sections()?)
    }

    /// Gets one section by name.
    pub fn get_section(&self, name: &str) -> ServiceResult<Option<Section>> {
        Ok(self.repo.get_section(name)?)
    }

    /// Files a card into a section. `false` when it was already there.
    pub fn add_card_to_section(&mut self, id: CardId, section: &str) -> ServiceResult<bool> {
        Ok(self.repo.link(id, section)?)
    }

    /// Removes a card from a section.
    pub fn remove_card_from_section(&mut self, id: CardId, section: &str) -> ServiceResult<bool> {
        Ok(self.repo.unlink(id, section)?)
    }

    /// Sections the given card is filed under.
    pub fn sections_of_card(&self, id: CardId) -> ServiceResult<Vec<Section>> {
        Ok(self.repo.sections_of(id)?)
    }

    /// Cards filed under the given section.
    pub fn cards_in_section(&self, section: &str) -> ServiceResult<Vec<Card>> {
        Ok(self.repo.cards_of(section)?)
    }

    /// Fuzzy-searches cards, optionally restricted to one section.
    ///
    /// Result order is store iteration order.
    pub fn search(&self, query: &str, section: Option<&str>) -> ServiceResult<Vec<Card>> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }

        let candidates = match section {
            Some(name) => self.repo.cards_of(name)?,
            None => self.repo.list_cards()?,
        };

        Ok(candidates
            .into_iter()
            .filter(|card| is_relevant(&query_terms, &card_tokens(card)))
            .collect())
    }

    /// Serializes the archive for the backup exporter.
    pub fn dump_archive(&mut self) -> ServiceResult<Vec<u8>> {
        Ok(self.repo.dump()?)
    }

    /// Reconstructs archive state from a dump stream.
    pub fn restore_archive(&mut self, bytes: &[u8]) -> ServiceResult<()> {
        Ok(self.repo.load_dump(bytes)?)
    }
}
