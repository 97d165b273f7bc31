//! Randomized tests for the query policy.
//!
//! Statement text is generated with random casing, surrounding whitespace and
//! filler so the classifier's normalization is exercised on every run.

use mysql_mcp_server::error::DbError;
use mysql_mcp_server::policy::{CapabilityPolicy, OperationKind, PolicyEnforcer, classify};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

const ITERATIONS: usize = 200;

fn random_case(s: &str) -> String {
    let mut rng = rand::thread_rng();
    s.chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn random_whitespace() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(0..4);
    (0..len)
        .map(|_| *[' ', '\t', '\n', '\r'].choose(&mut rng).unwrap_or(&' '))
        .collect()
}

/// Identifier that can never spell a keyword: a fixed prefix plus digits.
fn random_ident() -> String {
    format!("t_{}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Alphanumeric noise for string literals.
fn random_literal() -> String {
    let len = rand::thread_rng().gen_range(1..12);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn rejection(enforcer: &PolicyEnforcer, sql: &str) -> Option<String> {
    match enforcer.evaluate(sql) {
        Ok(_) => None,
        Err(DbError::PolicyViolation { reason, .. }) => Some(reason),
        Err(other) => panic!("unexpected error for {:?}: {:?}", sql, other),
    }
}

#[test]
fn test_gated_prefixes_denied_by_default() {
    let enforcer = PolicyEnforcer::new(CapabilityPolicy::default());
    let templates = [
        ("drop table {}", "DROP", "ALLOW_DROP"),
        ("create table {} (id int)", "CREATE", "ALLOW_CREATE"),
        ("alter table {} add c int", "ALTER", "ALLOW_ALTER"),
        ("truncate table {}", "TRUNCATE", "ALLOW_TRUNCATE"),
        ("insert into {} values (1)", "INSERT", "ALLOW_INSERT"),
        ("update {} set a = 1 where id = 2", "UPDATE", "ALLOW_UPDATE"),
        ("delete from {} where id = 2", "DELETE", "ALLOW_DELETE"),
    ];

    for _ in 0..ITERATIONS {
        for (template, keyword, flag) in templates {
            let sql = format!(
                "{}{}{}",
                random_whitespace(),
                random_case(&template.replace("{}", &random_ident())),
                random_whitespace()
            );
            assert_eq!(
                rejection(&enforcer, &sql),
                Some(format!("{} operations are not allowed ({}=false)", keyword, flag)),
                "sql: {:?}",
                sql
            );
        }
    }
}

#[test]
fn test_system_commands_denied_anywhere() {
    let policy = CapabilityPolicy {
        allow_insert: true,
        ..CapabilityPolicy::default()
    };
    let enforcer = PolicyEnforcer::new(policy);
    let commands = [
        ("shutdown", "SHUTDOWN"),
        ("kill 42", "KILL"),
        ("stop slave", "STOP SLAVE"),
        ("reset master", "RESET MASTER"),
    ];
    let leads = [
        "SELECT * FROM {} LIMIT 1; ",
        "SET @x = '{}'; ",
        "INSERT INTO {} VALUES (1); ",
        "",
    ];

    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let (command, expected) = commands.choose(&mut rng).copied().unwrap_or(commands[0]);
        let lead = leads.choose(&mut rng).copied().unwrap_or("");
        let sql = format!(
            "{}{}{}",
            random_whitespace(),
            lead.replace("{}", &random_literal()),
            random_case(command)
        );

        assert_eq!(
            rejection(&enforcer, &sql),
            Some(format!("System command '{}' is not allowed", expected)),
            "sql: {:?}",
            sql
        );
    }
}

#[test]
fn test_privilege_statements_denied_under_any_flags() {
    let policy = CapabilityPolicy {
        allow_ddl: true,
        allow_dml: true,
        allow_drop: true,
        allow_create: true,
        allow_alter: true,
        allow_insert: true,
        allow_update: true,
        allow_delete: true,
        allow_truncate: true,
        ..CapabilityPolicy::default()
    };
    let enforcer = PolicyEnforcer::new(policy);

    for _ in 0..ITERATIONS {
        for template in ["grant all on *.* to '{}'@'%'", "revoke select on db.* from '{}'"] {
            let sql = random_case(&template.replace("{}", &random_ident()));
            assert_eq!(
                rejection(&enforcer, &sql).as_deref(),
                Some("GRANT/REVOKE operations are not allowed"),
                "sql: {:?}",
                sql
            );
        }
    }
}

#[test]
fn test_limit_compared_against_max_rows() {
    let mut rng = rand::thread_rng();

    for _ in 0..ITERATIONS {
        let max_rows = rng.gen_range(1..=5000u32);
        let count = rng.gen_range(0..=10_000u32);
        let enforcer = PolicyEnforcer::new(CapabilityPolicy {
            max_rows,
            ..CapabilityPolicy::default()
        });

        let forms = [
            format!("select * from t limit {}", count),
            format!("SELECT * FROM t LIMIT {} OFFSET 5", count),
            format!("SELECT * FROM t LIMIT 7, {}", count),
        ];
        for sql in forms {
            let verdict = enforcer.check_limit(&sql);
            assert_eq!(verdict.is_valid, count <= max_rows, "sql: {} max: {}", sql, max_rows);
            if !verdict.is_valid {
                assert_eq!(
                    verdict.reason,
                    Some(format!(
                        "LIMIT {} exceeds the maximum allowed rows ({})",
                        count, max_rows
                    ))
                );
            }
        }
    }
}

#[test]
fn test_select_without_limit_always_denied() {
    let mut rng = rand::thread_rng();

    for _ in 0..ITERATIONS {
        let max_rows = rng.gen_range(1..=5000u32);
        let enforcer = PolicyEnforcer::new(CapabilityPolicy {
            max_rows,
            ..CapabilityPolicy::default()
        });
        let sql = format!(
            "{}select '{}' from {}",
            random_whitespace(),
            random_literal(),
            random_ident()
        );

        assert_eq!(
            rejection(&enforcer, &sql),
            Some(format!(
                "SELECT queries must include a LIMIT clause (maximum {} rows)",
                max_rows
            ))
        );
    }
}

#[test]
fn test_umbrella_flags_never_unlock_gated_classes() {
    let enforcer = PolicyEnforcer::new(CapabilityPolicy {
        allow_ddl: true,
        allow_dml: true,
        ..CapabilityPolicy::default()
    });
    let cases = [
        ("DROP TABLE {}", "DROP", "ALLOW_DROP"),
        ("CREATE TABLE {} (id INT)", "CREATE", "ALLOW_CREATE"),
        ("ALTER TABLE {} ADD c INT", "ALTER", "ALLOW_ALTER"),
        ("TRUNCATE TABLE {}", "TRUNCATE", "ALLOW_TRUNCATE"),
        ("INSERT INTO {} VALUES (1)", "INSERT", "ALLOW_INSERT"),
        ("UPDATE {} SET a = 1 WHERE id = 1", "UPDATE", "ALLOW_UPDATE"),
        ("DELETE FROM {} WHERE id = 1", "DELETE", "ALLOW_DELETE"),
    ];

    for _ in 0..ITERATIONS {
        for (template, keyword, flag) in cases {
            let sql = random_case(&template.replace("{}", &random_ident()));
            assert_eq!(
                rejection(&enforcer, &sql),
                Some(format!("{} operations are not allowed ({}=false)", keyword, flag)),
                "sql: {:?}",
                sql
            );
        }
    }
}

#[test]
fn test_specific_flag_unlocks_only_its_class() {
    let delete_only = PolicyEnforcer::new(CapabilityPolicy {
        allow_delete: true,
        ..CapabilityPolicy::default()
    });
    let drop_only = PolicyEnforcer::new(CapabilityPolicy {
        allow_drop: true,
        ..CapabilityPolicy::default()
    });

    for _ in 0..ITERATIONS {
        let table = random_ident();
        let delete = format!("DELETE FROM {} WHERE id = 1", table);
        let drop = format!("DROP TABLE {}", table);

        assert!(delete_only.evaluate(&delete).is_ok(), "should allow {}", delete);
        assert!(delete_only.evaluate(&drop).is_err(), "should deny {}", drop);
        assert!(drop_only.evaluate(&drop).is_ok(), "should allow {}", drop);
        assert!(drop_only.evaluate(&delete).is_err(), "should deny {}", delete);
    }
}

#[test]
fn test_update_floor_holds_when_update_allowed() {
    let enforcer = PolicyEnforcer::new(CapabilityPolicy {
        allow_update: true,
        ..CapabilityPolicy::default()
    });

    for _ in 0..ITERATIONS {
        let sql = random_case(&format!("update {} set a = 1", random_ident()));
        assert_eq!(
            rejection(&enforcer, &sql).as_deref(),
            Some("UPDATE without WHERE clause is not allowed")
        );
    }
}

#[test]
fn test_evaluation_is_deterministic() {
    let enforcer = PolicyEnforcer::new(CapabilityPolicy::default());
    let mut rng = rand::thread_rng();
    let pieces = [
        "SELECT", "select", "DROP", "LIMIT", "limit", "WHERE", "UPDATE", "SHUTDOWN", "KILL",
        "1", "500", "5000", "*", "FROM", "t", ";", ",", "?", "  ", "\n",
    ];

    for _ in 0..ITERATIONS {
        let len = rng.gen_range(0..10);
        let sql: Vec<&str> = (0..len)
            .map(|_| pieces.choose(&mut rng).copied().unwrap_or(""))
            .collect();
        let sql = sql.join(" ");

        let first = format!("{:?}", enforcer.evaluate(&sql));
        let second = format!("{:?}", enforcer.evaluate(&sql));
        assert_eq!(first, second, "sql: {:?}", sql);
        assert_eq!(classify(&sql), classify(&sql));
    }
}

#[test]
fn test_unrecognized_shapes_pass_through() {
    let enforcer = PolicyEnforcer::new(CapabilityPolicy::default());

    for sql in ["SHOW TABLES", "SET NAMES utf8mb4", "DESCRIBE users", "CALL refresh()"] {
        assert_eq!(classify(sql).kind, OperationKind::Other);
        assert_eq!(enforcer.evaluate(sql).ok(), Some(OperationKind::Other));
    }
}
