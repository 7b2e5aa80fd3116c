//! Page/size/order requests and the metadata derived from them.
//!
//! Pages are 1-indexed. Non-positive pages fall back to the first page and
//! non-positive sizes to [`DEFAULT_PAGE_SIZE`]. Ordering is restricted to a
//! fixed set of columns so nothing client-supplied ever reaches SQL text.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::UserError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Query-string shape accepted by listing routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    LoginDate,
    Name,
    Email,
}

impl SortColumn {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::LoginDate => "login_date",
            SortColumn::Name => "name",
            SortColumn::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderBy {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl OrderBy {
    /// SQL `ORDER BY` body. `user_id` breaks ties so pages never overlap.
    pub fn to_sql(self) -> String {
        format!(
            "{} {}, user_id ASC",
            self.column.as_sql(),
            self.direction.as_sql()
        )
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column.as_sql(), self.direction.as_sql())
    }
}

/// Parses `<column> [asc|desc]`, case-insensitively. Blank input is the
/// default order.
impl FromStr for OrderBy {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let Some(column) = parts.next() else {
            return Ok(OrderBy::default());
        };

        let column = match column.to_ascii_lowercase().as_str() {
            "created_at" => SortColumn::CreatedAt,
            "updated_at" => SortColumn::UpdatedAt,
            "login_date" => SortColumn::LoginDate,
            "name" => SortColumn::Name,
            "email" => SortColumn::Email,
            _ => return Err(invalid_order_by(s)),
        };

        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(_) => return Err(invalid_order_by(s)),
        };

        if parts.next().is_some() {
            return Err(invalid_order_by(s));
        }

        Ok(OrderBy { column, direction })
    }
}

fn invalid_order_by(raw: &str) -> UserError {
    UserError::Validation(format!(
        "order_by '{raw}' is not supported; expected one of name, email, created_at, \
         updated_at, login_date optionally followed by asc or desc"
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationQuery {
    page: i64,
    size: i64,
    order_by: OrderBy,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE, OrderBy::default())
    }
}

impl PaginationQuery {
    pub fn new(page: i64, size: i64, order_by: OrderBy) -> Self {
        Self {
            page: page.max(1),
            size: if size <= 0 { DEFAULT_PAGE_SIZE } else { size },
            order_by,
        }
    }

    pub fn from_params(params: &PaginationParams) -> Result<Self, UserError> {
        let order_by = match params.order_by.as_deref() {
            Some(raw) => raw.parse()?,
            None => OrderBy::default(),
        };
        Ok(Self::new(
            params.page.unwrap_or(1),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
            order_by,
        ))
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn order_by(&self) -> OrderBy {
        self.order_by
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            return 0;
        }
        (total_count - 1) / self.size + 1
    }

    pub fn has_more(&self, total_count: i64) -> bool {
        self.page < self.total_pages(total_count)
    }
}
