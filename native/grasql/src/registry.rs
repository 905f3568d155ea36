//! Maps a dialect name to a concrete `Dialect` implementation (spec.md §4.2
//! "Dialect registry").
use crate::config::{DialectConfig, DialectVersion, NameCase};
use crate::dialect::{mongo::MongoDialect, mssql::MsSqlDialect, mysql::MySqlDialect,
    postgres::PostgresDialect, sqlite::SqliteDialect, Dialect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialectName {
    Postgres,
    MySql,
    Sqlite,
    MsSql,
    MongoDb,
}

impl DialectName {
    fn default_config(self) -> DialectConfig {
        match self {
            DialectName::Postgres => DialectConfig {
                name_case: NameCase::Lower,
                version: DialectVersion { major: 15, minor: 0 },
                camel_case_fields: false,
                supports_lateral_joins: true,
                supports_returning: true,
                supports_writable_cte: true,
                supports_native_upsert: true,
                supports_recursive_cte: true,
                linear_execution: false,
            },
            DialectName::MySql => DialectConfig {
                name_case: NameCase::Preserve,
                version: DialectVersion { major: 8, minor: 0 },
                camel_case_fields: false,
                supports_lateral_joins: true,
                supports_returning: false,
                supports_writable_cte: true,
                supports_native_upsert: true,
                supports_recursive_cte: true,
                linear_execution: false,
            },
            DialectName::Sqlite => DialectConfig {
                name_case: NameCase::Preserve,
                version: DialectVersion { major: 3, minor: 40 },
                camel_case_fields: false,
                supports_lateral_joins: false,
                supports_returning: true,
                supports_writable_cte: false,
                supports_native_upsert: true,
                supports_recursive_cte: true,
                linear_execution: false,
            },
            DialectName::MsSql => DialectConfig {
                name_case: NameCase::Preserve,
                version: DialectVersion { major: 2019, minor: 0 },
                camel_case_fields: false,
                supports_lateral_joins: false,
                supports_returning: false,
                supports_writable_cte: true,
                supports_native_upsert: false,
                supports_recursive_cte: true,
                linear_execution: true,
            },
            DialectName::MongoDb => DialectConfig {
                name_case: NameCase::Preserve,
                version: DialectVersion { major: 6, minor: 0 },
                camel_case_fields: true,
                supports_lateral_joins: false,
                supports_returning: false,
                supports_writable_cte: false,
                supports_native_upsert: false,
                supports_recursive_cte: false,
                linear_execution: false,
            },
        }
    }
}

/// Constructs the dialect with its default `DialectConfig`. Each call
/// returns an owned, independently configured value — no global state is
/// shared between concurrent compiles (spec.md §5).
pub fn resolve(name: DialectName) -> Box<dyn Dialect> {
    resolve_with_config(name, name.default_config())
}

pub fn resolve_with_config(name: DialectName, config: DialectConfig) -> Box<dyn Dialect> {
    match name {
        DialectName::Postgres => Box::new(PostgresDialect::new(config)),
        DialectName::MySql => Box::new(MySqlDialect::new(config)),
        DialectName::Sqlite => Box::new(SqliteDialect::new(config)),
        DialectName::MsSql => Box::new(MsSqlDialect::new(config)),
        DialectName::MongoDb => Box::new(MongoDialect::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mssql_and_mongo_use_linear_or_non_lateral_execution() {
        assert!(DialectName::MsSql.default_config().linear_execution);
        assert!(!DialectName::MongoDb.default_config().supports_lateral_joins);
    }

    #[test]
    fn every_dialect_resolves() {
        for name in [
            DialectName::Postgres,
            DialectName::MySql,
            DialectName::Sqlite,
            DialectName::MsSql,
            DialectName::MongoDb,
        ] {
            let dialect = resolve(name);
            assert_eq!(dialect.name(), name);
        }
    }
}
