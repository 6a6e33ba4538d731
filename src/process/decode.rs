use chrono::NaiveDate;
use serde::Serialize;
use std::ops::RangeInclusive;

use crate::error::{ConfigError, DecodeError};
use crate::process::date_parser::last_day_of_period;
use crate::process::utils::{format_amount, parse_comma_decimal, trim_line_ending};
use crate::schema::types::{
    DEBT_COMPONENTS, ENTITY_CODE, IDENTIFICATION_NUMBER, INFORMATION_DATE, REQUIRED_FIELDS,
    SITUATION,
};
use crate::schema::{EntityDirectory, FieldSchema, FieldSpan, ParsedFields};

/// Situation codes that produce a record.
pub const ACCEPTED_SITUATIONS: RangeInclusive<i64> = 1..=6;

/// Situation 11 is reported as situation 1.
const SITUATION_ALIAS: (i64, i64) = (11, 1);

/// One normalized debt entry, serialized as-is into the borrower document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebtRecord {
    pub entity_name: String,
    pub situation: String,
    pub debt_amount: String,
    /// Serialized as `YYYY-MM-DD`.
    pub information_date: NaiveDate,
}

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record {
        identification_number: String,
        record: DebtRecord,
    },
    /// Situation outside the accepted range after remapping. Expected, not an error.
    Filtered { situation: i64 },
    Error(DecodeError),
}

/// Column positions the decoder reads, resolved once against the schema.
#[derive(Debug)]
struct Columns {
    entity_code: usize,
    situation: usize,
    identification_number: usize,
    information_date: usize,
    /// Monetary fields in schema order, which is also summation order.
    components: Vec<(&'static str, usize)>,
}

/// Turns raw fixed-width lines into [`DebtRecord`]s.
#[derive(Debug)]
pub struct RecordDecoder<'a> {
    schema: &'a FieldSchema,
    directory: &'a EntityDirectory,
    columns: Columns,
    identifier: FieldSpan,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(
        schema: &'a FieldSchema,
        directory: &'a EntityDirectory,
    ) -> Result<Self, ConfigError> {
        schema.require(&REQUIRED_FIELDS)?;
        let pos = |name: &'static str| schema.position(name).ok_or(ConfigError::MissingField(name));

        let mut components = DEBT_COMPONENTS
            .iter()
            .map(|&name| pos(name).map(|i| (name, i)))
            .collect::<Result<Vec<_>, _>>()?;
        components.sort_by_key(|&(_, i)| i);

        let columns = Columns {
            entity_code: pos(ENTITY_CODE)?,
            situation: pos(SITUATION)?,
            identification_number: pos(IDENTIFICATION_NUMBER)?,
            information_date: pos(INFORMATION_DATE)?,
            components,
        };
        let identifier = schema
            .span(IDENTIFICATION_NUMBER)
            .ok_or(ConfigError::MissingField(IDENTIFICATION_NUMBER))?;

        Ok(Self {
            schema,
            directory,
            columns,
            identifier,
        })
    }

    /// Where the borrower identifier lives in a line. The indexer groups lines
    /// through this same span, so grouping and decoding always agree.
    pub fn identifier_span(&self) -> FieldSpan {
        self.identifier
    }

    pub fn decode(&self, raw_line: &str) -> Decoded {
        let fields = self.schema.slice(trim_line_ending(raw_line));
        match self.decode_fields(&fields) {
            Ok(decoded) => decoded,
            Err(e) => Decoded::Error(e),
        }
    }

    fn decode_fields(&self, fields: &ParsedFields<'_, '_>) -> Result<Decoded, DecodeError> {
        let situation = normalize_situation(parse_situation(fields.value(self.columns.situation))?);
        if !ACCEPTED_SITUATIONS.contains(&situation) {
            return Ok(Decoded::Filtered { situation });
        }

        let entity_name = self
            .directory
            .resolve(fields.value(self.columns.entity_code))
            .to_string();

        let mut total = 0.0_f64;
        for &(name, idx) in &self.columns.components {
            let raw = fields.value(idx);
            total += parse_comma_decimal(raw).ok_or_else(|| DecodeError::InvalidAmount {
                field: name,
                value: raw.to_string(),
            })?;
        }

        let information_date = last_day_of_period(fields.value(self.columns.information_date))?;

        Ok(Decoded::Record {
            identification_number: fields
                .value(self.columns.identification_number)
                .trim()
                .to_string(),
            record: DebtRecord {
                entity_name,
                situation: situation.to_string(),
                debt_amount: format_amount(total * 1000.0),
                information_date,
            },
        })
    }
}

fn parse_situation(raw: &str) -> Result<i64, DecodeError> {
    raw.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidSituation(raw.to_string()))
}

fn normalize_situation(code: i64) -> i64 {
    if code == SITUATION_ALIAS.0 {
        SITUATION_ALIAS.1
    } else {
        code
    }
}
