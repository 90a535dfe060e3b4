use redb::{Database as RedbDatabase, ReadableTable};
use std::path::Path;
use thiserror::Error;

use super::models::User;
use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("phone {0} is linked to a different account")]
    PhoneTaken(String),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

pub struct Database {
    db: RedbDatabase,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("telegram-gateway.redb");
        let db = RedbDatabase::create(db_path)?;

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(PHONE_OWNERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new user record.
    ///
    /// Fails with [`DatabaseError::DuplicateEmail`] if the email is taken;
    /// the aborted transaction leaves no partial record.
    pub fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            if table.get(user.email.as_str())?.is_some() {
                return Err(DatabaseError::DuplicateEmail);
            }
            let data = bincode::serialize(user)?;
            table.insert(user.email.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user by email
    pub fn get_user(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(email)? {
            Some(data) => {
                let user: User = bincode::deserialize(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Look up which email, if any, has a given phone number linked
    pub fn find_phone_owner(&self, phone: &str) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PHONE_OWNERS)?;

        Ok(table.get(phone)?.map(|v| v.value().to_string()))
    }

    /// Link or unlink a phone number on a user record.
    ///
    /// Updates the record and the phone index in one transaction. Linking
    /// a phone the index already maps to a different email fails with
    /// [`DatabaseError::PhoneTaken`]: callers may pre-check ownership, but
    /// that check races, so the transaction is the authority.
    pub fn update_phone(&self, email: &str, phone: Option<&str>) -> Result<User, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut users = write_txn.open_table(USERS)?;
            let mut user: User = match users.get(email)? {
                Some(data) => bincode::deserialize(data.value())?,
                None => return Err(DatabaseError::UnknownUser(email.to_string())),
            };

            let mut owners = write_txn.open_table(PHONE_OWNERS)?;
            if let Some(new) = phone {
                if owners.get(new)?.is_some_and(|v| v.value() != email) {
                    return Err(DatabaseError::PhoneTaken(new.to_string()));
                }
            }

            let previous = user.phone.take();
            user.phone = phone.map(str::to_string);
            let data = bincode::serialize(&user)?;
            users.insert(email, data.as_slice())?;

            if let Some(old) = previous.as_deref() {
                owners.remove(old)?;
            }
            if let Some(new) = phone {
                owners.insert(new, email)?;
            }

            user
        };
        write_txn.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_user, setup_db};

    #[test]
    fn create_and_get_user() {
        let (db, _temp) = setup_db();

        let user = make_user("alice@example.com");
        db.create_user(&user).unwrap();

        let fetched = db.get_user("alice@example.com").unwrap().unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.phone, None);

        assert!(db.get_user("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected_without_mutation() {
        let (db, _temp) = setup_db();

        let user = make_user("alice@example.com");
        db.create_user(&user).unwrap();

        let mut second = make_user("alice@example.com");
        second.password_hash = "other-digest".to_string();
        let err = db.create_user(&second).unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateEmail));

        // Original record is untouched
        let fetched = db.get_user("alice@example.com").unwrap().unwrap();
        assert_eq!(fetched.password_hash, user.password_hash);
    }

    #[test]
    fn phone_link_and_unlink_update_the_index() {
        let (db, _temp) = setup_db();

        db.create_user(&make_user("alice@example.com")).unwrap();

        let updated = db
            .update_phone("alice@example.com", Some("+15551234567"))
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+15551234567"));
        assert_eq!(
            db.find_phone_owner("+15551234567").unwrap().as_deref(),
            Some("alice@example.com")
        );

        let cleared = db.update_phone("alice@example.com", None).unwrap();
        assert_eq!(cleared.phone, None);
        assert!(db.find_phone_owner("+15551234567").unwrap().is_none());
    }

    #[test]
    fn relinking_a_new_phone_drops_the_old_index_entry() {
        let (db, _temp) = setup_db();

        db.create_user(&make_user("alice@example.com")).unwrap();
        db.update_phone("alice@example.com", Some("+15551111111"))
            .unwrap();
        db.update_phone("alice@example.com", Some("+15552222222"))
            .unwrap();

        assert!(db.find_phone_owner("+15551111111").unwrap().is_none());
        assert_eq!(
            db.find_phone_owner("+15552222222").unwrap().as_deref(),
            Some("alice@example.com")
        );
    }

    #[test]
    fn linking_a_phone_owned_by_someone_else_is_rejected() {
        let (db, _temp) = setup_db();

        db.create_user(&make_user("alice@example.com")).unwrap();
        db.create_user(&make_user("bob@example.com")).unwrap();
        db.update_phone("alice@example.com", Some("+15551234567"))
            .unwrap();

        let err = db
            .update_phone("bob@example.com", Some("+15551234567"))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::PhoneTaken(_)));

        // Nothing moved: the index still points at alice and bob's record
        // is untouched
        assert_eq!(
            db.find_phone_owner("+15551234567").unwrap().as_deref(),
            Some("alice@example.com")
        );
        assert!(db.get_user("bob@example.com").unwrap().unwrap().phone.is_none());
        assert_eq!(
            db.get_user("alice@example.com")
                .unwrap()
                .unwrap()
                .phone
                .as_deref(),
            Some("+15551234567")
        );

        // Re-linking your own phone stays allowed
        db.update_phone("alice@example.com", Some("+15551234567"))
            .unwrap();
    }

    #[test]
    fn update_phone_for_unknown_user_fails() {
        let (db, _temp) = setup_db();

        let err = db.update_phone("ghost@example.com", Some("+1555")).unwrap_err();
        assert!(matches!(err, DatabaseError::UnknownUser(_)));
    }

    #[test]
    fn records_survive_reopen() {
        let temp = tempfile::TempDir::new().unwrap();
        {
            let db = Database::open(temp.path()).unwrap();
            db.create_user(&make_user("alice@example.com")).unwrap();
            db.update_phone("alice@example.com", Some("+15551234567"))
                .unwrap();
        }

        let db = Database::open(temp.path()).unwrap();
        let user = db.get_user("alice@example.com").unwrap().unwrap();
        assert_eq!(user.phone.as_deref(), Some("+15551234567"));
    }
}
