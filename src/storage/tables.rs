use redb::TableDefinition;

/// Users: email -> User (bincode)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Secondary index: phone number -> owning email (for ownership checks)
pub const PHONE_OWNERS: TableDefinition<&str, &str> = TableDefinition::new("phone_owners");
