use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::engine::{Account, DEFAULT_DAILY_MAX};
use crate::{AccountId, AccountKind, Amount, Operation, UserId};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: unrecognized account kind '{kind}'")]
    UnrecognizedKind { line: usize, kind: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    account: AccountId,
    user: Option<UserId>,
    to: Option<AccountId>,
    kind: Option<String>,
    amount: Option<i64>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    account: AccountId,
    user: UserId,
    kind: String,
    balance: i64,
    used: i64,
    version: u64,
}

/// Read ledger operations from a csv file
pub fn read_operations(
    path: impl AsRef<Path>,
) -> impl Iterator<Item = Result<Operation, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;

            let amount = |op: &str| {
                row.amount
                    .map(Amount::from_minor)
                    .ok_or_else(|| CsvError::MissingField {
                        line,
                        op: op.to_string(),
                        field: "amount",
                    })
            };

            match row.op.as_str() {
                "open" => {
                    let kind = row.kind.as_deref().ok_or_else(|| CsvError::MissingField {
                        line,
                        op: "open".to_string(),
                        field: "kind",
                    })?;
                    let kind = match kind.to_ascii_lowercase().as_str() {
                        "main" => AccountKind::Main,
                        "savings" => AccountKind::Savings,
                        other => {
                            return Err(CsvError::UnrecognizedKind {
                                line,
                                kind: other.to_string(),
                            });
                        }
                    };
                    Ok(Operation::Open {
                        account: row.account,
                        user: row.user.unwrap_or(row.account),
                        kind,
                        balance: amount("open")?,
                        daily_max: DEFAULT_DAILY_MAX,
                    })
                }
                "transfer" => {
                    let to = row.to.ok_or_else(|| CsvError::MissingField {
                        line,
                        op: "transfer".to_string(),
                        field: "to",
                    })?;
                    Ok(Operation::Transfer {
                        from: row.account,
                        to,
                        amount: amount("transfer")?,
                    })
                }
                "deposit" => Ok(Operation::Deposit {
                    account: row.account,
                    amount: amount("deposit")?,
                }),
                "withdraw" => Ok(Operation::Withdraw {
                    account: row.account,
                    amount: amount("withdraw")?,
                }),
                other => Err(CsvError::UnrecognizedOp {
                    line,
                    op: other.to_string(),
                }),
            }
        })
}

/// write account snapshots to stdout in csv format
pub fn write_accounts(accounts: impl IntoIterator<Item = Account>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    for account in accounts {
        let row = OutputRow {
            account: account.id(),
            user: account.user(),
            kind: account.kind().to_string(),
            balance: account.balance().minor(),
            used: account.limit().used().minor(),
            version: account.version(),
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}
