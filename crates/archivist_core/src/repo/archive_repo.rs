//! Archive repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over card, section, and relation storage.
//! - Enforce title/section uniqueness and relation cascade rules.
//! - Produce and consume point-in-time archive snapshots.
//!
//! # Invariants
//! - Card titles are unique across the whole archive.
//! - A relation row only ever references a card and section that exist;
//!   deleting either endpoint removes the relation in the same transaction.
//! - `modified`/`modified_by` refresh on every successful card write.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::card::{
    normalize_tags, tags_from_column, tags_to_column, validate_section_name, Card, CardDraft,
    CardId, CardPatch, CardValidationError, Section, UNKNOWN_AUTHOR,
};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CARD_SELECT_SQL: &str = "SELECT
    id,
    title,
    desc,
    content,
    tags,
    modified,
    modified_by
FROM cards";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for archive persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CardValidationError),
    Db(DbError),
    /// No card row for the given id.
    CardNotFound(CardId),
    /// No section row for the given name.
    SectionNotFound(String),
    /// Another card already owns the title.
    DuplicateTitle(String),
    /// A section with the target name already exists.
    DuplicateSection(String),
    /// Persisted or snapshot data failed decoding.
    InvalidData(String),
    /// Connection has no applied migrations.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::CardNotFound(id) => write!(f, "card not found: {id}"),
            Self::SectionNotFound(name) => write!(f, "section not found: {name}"),
            Self::DuplicateTitle(title) => write!(f, "card title already exists: {title}"),
            Self::DuplicateSection(name) => write!(f, "section already exists: {name}"),
            Self::InvalidData(message) => write!(f, "invalid archive data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is not migrated to {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table is missing: {table}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CardValidationError> for RepoError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One card/section membership pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub card_id: CardId,
    pub section_name: String,
}

/// Complete point-in-time archive state, the `dump`/`load_dump` wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
    pub cards: Vec<Card>,
    pub sections: Vec<Section>,
    pub relations: Vec<Relation>,
}

/// Repository interface for archive storage operations.
pub trait ArchiveRepository {
    /// Creates one card; fails with `DuplicateTitle` on a title collision.
    fn create_card(&mut self, draft: &CardDraft) -> RepoResult<Card>;
    /// Gets one card by id. No side effects.
    fn get_card(&self, id: CardId) -> RepoResult<Option<Card>>;
    /// Applies the present patch fields and refreshes modified metadata.
    fn update_card(&mut self, id: CardId, patch: &CardPatch, author: Option<&str>)
        -> RepoResult<Card>;
    /// Deletes one card and all its relations. Returns whether a row existed.
    fn delete_card(&mut self, id: CardId) -> RepoResult<bool>;
    /// Lists all cards in stable id order.
    fn list_cards(&self) -> RepoResult<Vec<Card>>;
    /// Creates one section; the name must satisfy the identifier pattern.
    fn create_section(&mut self, name: &str) -> RepoResult<()>;
    /// Deletes one section and its relations; cards are untouched.
    fn delete_section(&mut self, name: &str) -> RepoResult<bool>;
    /// Renames a section, re-keying its relations.
    fn rename_section(&mut self, old: &str, new: &str) -> RepoResult<()>;
    /// Lists all sections sorted by name.
    fn list_sections(&self) -> RepoResult<Vec<Section>>;
    /// Gets one section by name.
    fn get_section(&self, name: &str) -> RepoResult<Option<Section>>;
    /// Links a card into a section. Returns `false` when already linked.
    fn link(&mut self, card_id: CardId, section_name: &str) -> RepoResult<bool>;
    /// Removes one membership pair. Returns whether a row was removed.
    fn unlink(&mut self, card_id: CardId, section_name: &str) -> RepoResult<bool>;
    /// Sections a card belongs to. Empty for an unknown or unfiled card.
    fn sections_of(&self, card_id: CardId) -> RepoResult<Vec<Section>>;
    /// Cards filed under a section, in stable id order.
    fn cards_of(&self, section_name: &str) -> RepoResult<Vec<Card>>;
    /// Serializes a consistent snapshot of the whole archive.
    fn dump(&mut self) -> RepoResult<Vec<u8>>;
    /// Reconstructs archive state from a snapshot produced by [`dump`].
    ///
    /// [`dump`]: ArchiveRepository::dump
    fn load_dump(&mut self, bytes: &[u8]) -> RepoResult<()>;
}

/// SQLite-backed archive repository.
pub struct SqliteArchiveRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteArchiveRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ArchiveRepository for SqliteArchiveRepository<'_> {
    fn create_card(&mut self, draft: &CardDraft) -> RepoResult<Card> {
        draft.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if title_exists(&tx, draft.title.as_str(), None)? {
            return Err(RepoError::DuplicateTitle(draft.title.clone()));
        }

        tx.execute(
            "INSERT INTO cards (title, desc, content, tags, modified, modified_by)
             VALUES (?1, ?2, ?3, ?4, (strftime('%s', 'now') * 1000), ?5);",
            params![
                draft.title.as_str(),
                draft.desc.as_str(),
                draft.content.as_str(),
                tags_to_column(&normalize_tags(&draft.tags)),
                draft.author.as_deref().unwrap_or(UNKNOWN_AUTHOR),
            ],
        )?;

        let id = tx.last_insert_rowid();
        let card = get_card_in_tx(&tx, id)?.ok_or(RepoError::CardNotFound(id))?;
        tx.commit()?;
        Ok(card)
    }

    fn get_card(&self, id: CardId) -> RepoResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_card_row(row)?));
        }
        Ok(None)
    }

    fn update_card(
        &mut self,
        id: CardId,
        patch: &CardPatch,
        author: Option<&str>,
    ) -> RepoResult<Card> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = get_card_in_tx(&tx, id)?.ok_or(RepoError::CardNotFound(id))?;

        let title = match patch.title.as_deref() {
            Some(value) => {
                if value.trim().is_empty() {
                    return Err(RepoError::Validation(CardValidationError::EmptyTitle));
                }
                if value != current.title && title_exists(&tx, value, Some(id))? {
                    return Err(RepoError::DuplicateTitle(value.to_string()));
                }
                value.to_string()
            }
            None => current.title,
        };
        let desc = patch.desc.clone().unwrap_or(current.desc);
        let content = patch.content.clone().unwrap_or(current.content);
        let tags = match patch.tags.as_ref() {
            Some(values) => normalize_tags(values),
            None => current.tags,
        };

        tx.execute(
            "UPDATE cards
             SET
                title = ?2,
                desc = ?3,
                content = ?4,
                tags = ?5,
                modified = (strftime('%s', 'now') * 1000),
                modified_by = ?6
             WHERE id = ?1;",
            params![
                id,
                title,
                desc,
                content,
                tags_to_column(&tags),
                author.unwrap_or(UNKNOWN_AUTHOR),
            ],
        )?;

        let card = get_card_in_tx(&tx, id)?.ok_or(RepoError::CardNotFound(id))?;
        tx.commit()?;
        Ok(card)
    }

    fn delete_card(&mut self, id: CardId) -> RepoResult<bool> {
        // Relation rows fall with the card via FK cascade, atomically with
        // the row delete.
        let changed = self.conn.execute("DELETE FROM cards WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn list_cards(&self) -> RepoResult<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(row)?);
        }
        Ok(cards)
    }

    fn create_section(&mut self, name: &str) -> RepoResult<()> {
        validate_section_name(name)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if section_exists(&tx, name)? {
            return Err(RepoError::DuplicateSection(name.to_string()));
        }
        tx.execute("INSERT INTO sections (name) VALUES (?1);", [name])?;
        tx.commit()?;
        Ok(())
    }

    fn delete_section(&mut self, name: &str) -> RepoResult<bool> {
        // Relation rows fall with the section via FK cascade; card rows are
        // never touched.
        let changed = self
            .conn
            .execute("DELETE FROM sections WHERE name = ?1;", [name])?;
        Ok(changed > 0)
    }

    fn rename_section(&mut self, old: &str, new: &str) -> RepoResult<()> {
        validate_section_name(new)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !section_exists(&tx, old)? {
            return Err(RepoError::SectionNotFound(old.to_string()));
        }
        if section_exists(&tx, new)? {
            return Err(RepoError::DuplicateSection(new.to_string()));
        }

        // ON UPDATE CASCADE re-keys card_sections rows, not duplicates them.
        tx.execute(
            "UPDATE sections SET name = ?2 WHERE name = ?1;",
            params![old, new],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_sections(&self) -> RepoResult<Vec<Section>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sections ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(Section {
                name: row.get("name")?,
            });
        }
        Ok(sections)
    }

    fn get_section(&self, name: &str) -> RepoResult<Option<Section>> {
        if section_exists(self.conn, name)? {
            Ok(Some(Section {
                name: name.to_string(),
            }))
        } else {
            Ok(None)
        }
    }

    fn link(&mut self, card_id: CardId, section_name: &str) -> RepoResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !card_exists(&tx, card_id)? {
            return Err(RepoError::CardNotFound(card_id));
        }
        if !section_exists(&tx, section_name)? {
            return Err(RepoError::SectionNotFound(section_name.to_string()));
        }

        let changed = tx.execute(
            "INSERT OR IGNORE INTO card_sections (card_id, section_name) VALUES (?1, ?2);",
            params![card_id, section_name],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    fn unlink(&mut self, card_id: CardId, section_name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM card_sections WHERE card_id = ?1 AND section_name = ?2;",
            params![card_id, section_name],
        )?;
        Ok(changed > 0)
    }

    fn sections_of(&self, card_id: CardId) -> RepoResult<Vec<Section>> {
        let mut stmt = self.conn.prepare(
            "SELECT section_name
             FROM card_sections
             WHERE card_id = ?1
             ORDER BY section_name ASC;",
        )?;
        let mut rows = stmt.query([card_id])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(Section {
                name: row.get("section_name")?,
            });
        }
        Ok(sections)
    }

    fn cards_of(&self, section_name: &str) -> RepoResult<Vec<Card>> {
        if !section_exists(self.conn, section_name)? {
            return Err(RepoError::SectionNotFound(section_name.to_string()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "{CARD_SELECT_SQL}
             INNER JOIN card_sections cs ON cs.card_id = cards.id
             WHERE cs.section_name = ?1
             ORDER BY cards.id ASC;"
        ))?;
        let mut rows = stmt.query([section_name])?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(row)?);
        }
        Ok(cards)
    }

    fn dump(&mut self) -> RepoResult<Vec<u8>> {
        // A transaction pins one point-in-time view; the snapshot never
        // interleaves with an in-flight write.
        let tx = self.conn.transaction()?;
        let snapshot = read_snapshot(&tx)?;
        tx.commit()?;

        info!(
            "event=archive_dump module=repo status=ok cards={} sections={} relations={}",
            snapshot.cards.len(),
            snapshot.sections.len(),
            snapshot.relations.len()
        );
        serde_json::to_vec(&snapshot)
            .map_err(|err| RepoError::InvalidData(format!("snapshot encoding failed: {err}")))
    }

    fn load_dump(&mut self, bytes: &[u8]) -> RepoResult<()> {
        let snapshot: ArchiveSnapshot = serde_json::from_slice(bytes)
            .map_err(|err| RepoError::InvalidData(format!("snapshot decoding failed: {err}")))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for section in &snapshot.sections {
            validate_section_name(section.name.as_str())?;
            tx.execute(
                "INSERT INTO sections (name) VALUES (?1);",
                [section.name.as_str()],
            )?;
        }
        for card in &snapshot.cards {
            tx.execute(
                "INSERT INTO cards (id, title, desc, content, tags, modified, modified_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    card.id,
                    card.title.as_str(),
                    card.desc.as_str(),
                    card.content.as_str(),
                    tags_to_column(&card.tags),
                    card.modified,
                    card.modified_by.as_str(),
                ],
            )?;
        }
        for relation in &snapshot.relations {
            tx.execute(
                "INSERT INTO card_sections (card_id, section_name) VALUES (?1, ?2);",
                params![relation.card_id, relation.section_name.as_str()],
            )?;
        }
        tx.commit()?;

        info!(
            "event=archive_restore module=repo status=ok cards={} sections={} relations={}",
            snapshot.cards.len(),
            snapshot.sections.len(),
            snapshot.relations.len()
        );
        Ok(())
    }
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<Card> {
    let id: CardId = row.get("id")?;
    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid id value `{id}` in cards.id"
        )));
    }

    let tags_column: String = row.get("tags")?;
    Ok(Card {
        id,
        title: row.get("title")?,
        desc: row.get("desc")?,
        content: row.get("content")?,
        tags: tags_from_column(&tags_column),
        modified: row.get("modified")?,
        modified_by: row.get("modified_by")?,
    })
}

fn get_card_in_tx(tx: &Transaction<'_>, id: CardId) -> RepoResult<Option<Card>> {
    let mut stmt = tx.prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_card_row(row)?));
    }
    Ok(None)
}

fn title_exists(conn: &Connection, title: &str, exclude: Option<CardId>) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM cards WHERE title = ?1 AND id <> ?2
        );",
        params![title, exclude.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn card_exists(conn: &Connection, id: CardId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cards WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn section_exists(conn: &Connection, name: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sections WHERE name = ?1);",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn read_snapshot(tx: &Transaction<'_>) -> RepoResult<ArchiveSnapshot> {
    let mut cards = Vec::new();
    let mut stmt = tx.prepare(&format!("{CARD_SELECT_SQL} ORDER BY id ASC;"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        cards.push(parse_card_row(row)?);
    }

    let mut sections = Vec::new();
    let mut stmt = tx.prepare("SELECT name FROM sections ORDER BY name ASC;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        sections.push(Section {
            name: row.get("name")?,
        });
    }

    let mut relations = Vec::new();
    let mut stmt = tx.prepare(
        "SELECT card_id, section_name
         FROM card_sections
         ORDER BY card_id ASC, section_name ASC;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        relations.push(Relation {
            card_id: row.get("card_id")?,
            section_name: row.get("section_name")?,
        });
    }

    Ok(ArchiveSnapshot {
        cards,
        sections,
        relations,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected = crate::db::migrations::latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }

    for table in ["cards", "sections", "card_sections"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
