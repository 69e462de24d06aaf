//! Ad listing filter: turns the `GET /ads` query string into SQL predicates.
//!
//! Filter types combine with AND. Within `cat` and `location` the supplied
//! values combine with OR. Every value is bound as a parameter.

use sqlx::{Postgres, QueryBuilder};

use crate::ads::dto::AdListQuery;
use crate::error::AppError;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdFilter {
    pub categories: Vec<i64>,
    pub text: Option<String>,
    pub locations: Vec<String>,
    /// `price >= min_price`, from `price_from`.
    pub min_price: Option<i64>,
    /// `price <= max_price`, from `price_to`.
    pub max_price: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Bounds are `i64` so any non-negative bound is accepted, even past the
/// largest storable price.
fn parse_price(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.parse::<i64>()
        .ok()
        .filter(|p| *p >= 0)
        .map(Some)
        .ok_or_else(|| AppError::validation(format!("{name} must be a non-negative integer")))
}

impl AdFilter {
    pub fn from_query(q: &AdListQuery) -> Result<Self, AppError> {
        let categories = q
            .cat
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| {
                c.parse::<i64>()
                    .map_err(|_| AppError::validation(format!("Invalid category id: {c}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let locations = q
            .location
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            categories,
            text: q.text.clone().filter(|t| !t.is_empty()),
            locations,
            min_price: parse_price("price_from", non_empty(&q.price_from))?,
            max_price: parse_price("price_to", non_empty(&q.price_to))?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == AdFilter::default()
    }

    /// Appends ` WHERE ...` to `qb`. The query must alias `ads` as `a`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut first = true;

        if !self.categories.is_empty() {
            push_clause(qb, &mut first);
            qb.push("a.category_id = ANY(")
                .push_bind(self.categories.clone())
                .push(")");
        }

        if let Some(text) = &self.text {
            push_clause(qb, &mut first);
            qb.push("a.name ILIKE ").push_bind(contains_pattern(text));
        }

        if !self.locations.is_empty() {
            push_clause(qb, &mut first);
            qb.push(
                "EXISTS (SELECT 1 FROM user_locations ul \
                 JOIN locations l ON l.id = ul.location_id \
                 WHERE ul.user_id = a.author_id AND (",
            );
            let mut any = qb.separated(" OR ");
            for location in &self.locations {
                any.push("l.name ILIKE ")
                    .push_bind_unseparated(contains_pattern(location));
            }
            qb.push("))");
        }

        if let Some(min) = self.min_price {
            push_clause(qb, &mut first);
            qb.push("a.price >= ").push_bind(min);
        }

        if let Some(max) = self.max_price {
            push_clause(qb, &mut first);
            qb.push("a.price <= ").push_bind(max);
        }
    }
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

impl Page {
    pub fn from_query(q: &AdListQuery) -> Result<Self, AppError> {
        let limit = match non_empty(&q.limit) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|l| *l > 0)
                .ok_or_else(|| AppError::validation("limit must be a positive integer"))?
                .min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };
        let offset = match non_empty(&q.offset) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|o| *o >= 0)
                .ok_or_else(|| AppError::validation("offset must be a non-negative integer"))?,
            None => 0,
        };
        Ok(Self { limit, offset })
    }
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards in the needle
/// taken literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
