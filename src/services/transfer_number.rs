use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::transfer_sequence::{self, Entity as TransferSequence},
    errors::ServiceError,
};

lazy_static! {
    static ref TRANSFER_NUMBER_RE: Regex =
        Regex::new(r"^TR-(\d{6})-(\d{4})$").expect("transfer number pattern is valid");
}

/// Formats a document number from its period and sequence value.
pub fn format_transfer_number(period: &str, sequence: i64) -> String {
    format!("TR-{}-{:04}", period, sequence)
}

/// Parses a document number back into (period, sequence). Returns `None` for
/// anything that is not a well-formed transfer number.
pub fn parse_transfer_number(number: &str) -> Option<(String, i64)> {
    let captures = TRANSFER_NUMBER_RE.captures(number)?;
    let period = captures.get(1)?.as_str().to_string();
    let sequence = captures.get(2)?.as_str().parse().ok()?;
    Some((period, sequence))
}

/// Allocates monotonic transfer numbers per business and calendar month.
///
/// The counter row is incremented with a single UPDATE so concurrent creates
/// in the same period serialize on the row instead of racing a
/// read-max-then-write window. First use of a period inserts the row; the
/// composite primary key turns a concurrent first use into a constraint
/// error, which we resolve by retrying the increment.
#[derive(Clone, Default)]
pub struct TransferNumberAllocator;

impl TransferNumberAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the next number for `business_id` within `period` (`YYYYMM`).
    /// Must run inside the caller's transaction so a rolled-back create does
    /// not burn a visible gap on its own.
    pub async fn next<C: ConnectionTrait>(
        &self,
        conn: &C,
        business_id: Uuid,
        period: &str,
    ) -> Result<String, ServiceError> {
        for attempt in 0..2 {
            let updated = TransferSequence::update_many()
                .col_expr(
                    transfer_sequence::Column::LastValue,
                    Expr::col(transfer_sequence::Column::LastValue).add(1),
                )
                .filter(transfer_sequence::Column::BusinessId.eq(business_id))
                .filter(transfer_sequence::Column::Period.eq(period))
                .exec(conn)
                .await
                .map_err(ServiceError::db_error)?;

            if updated.rows_affected > 0 {
                let row = TransferSequence::find_by_id((business_id, period.to_string()))
                    .one(conn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::InternalError(
                            "transfer sequence row vanished after increment".to_string(),
                        )
                    })?;
                return Ok(format_transfer_number(period, row.last_value));
            }

            let seeded = transfer_sequence::ActiveModel {
                business_id: Set(business_id),
                period: Set(period.to_string()),
                last_value: Set(1),
            }
            .insert(conn)
            .await;

            match seeded {
                Ok(row) => return Ok(format_transfer_number(period, row.last_value)),
                // Lost the race to seed the period; the row now exists, so
                // the next increment attempt will find it.
                Err(e) if attempt == 0 => {
                    debug!(
                        %business_id,
                        period,
                        error = %e,
                        "transfer sequence seed conflicted, retrying increment"
                    );
                }
                Err(e) => return Err(ServiceError::db_error(e)),
            }
        }

        Err(ServiceError::InternalError(
            "failed to allocate transfer number".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_transfer_number("202608", 7), "TR-202608-0007");
        assert_eq!(format_transfer_number("202612", 1234), "TR-202612-1234");
    }

    #[test]
    fn parses_well_formed_numbers() {
        assert_eq!(
            parse_transfer_number("TR-202608-0007"),
            Some(("202608".to_string(), 7))
        );
        assert_eq!(
            parse_transfer_number("TR-202612-9999"),
            Some(("202612".to_string(), 9999))
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in [
            "TR-2026-0007",
            "TX-202608-0007",
            "TR-202608-07",
            "tr-202608-0007",
            "TR-202608-0007-extra",
            "",
        ] {
            assert_eq!(parse_transfer_number(bad), None, "{} should not parse", bad);
        }
    }

    #[test]
    fn format_and_parse_round_trip() {
        let number = format_transfer_number("202601", 42);
        assert_eq!(parse_transfer_number(&number), Some(("202601".to_string(), 42)));
    }
}
