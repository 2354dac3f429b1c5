//! Admin list views - search and sort over fixed column sets.
//!
//! Each listing exposes a closed set of sortable columns. `sort` names one of
//! them, optionally prefixed with `-` for descending order; anything else is
//! rejected with [`Error::InvalidSort`]. `q` is a case-insensitive substring
//! search over the listing's text columns.

use crate::{
    entities::{
        City, Country, State, TeamMember, User, UserAddress, city, country, state, team_member,
        user, user_address,
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, Order, QueryOrder, Select, prelude::*, sea_query::LikeExpr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query string of a listing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    /// Search term
    pub q: Option<String>,
    /// Sort column, `-` prefix for descending
    pub sort: Option<String>,
}

impl ListQuery {
    fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Sort direction parsed from the `sort` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// Looks `sort` up in a listing's column set.
///
/// Returns `None` when no sort was requested.
///
/// # Errors
/// Returns [`Error::InvalidSort`] for a column outside the set.
pub fn resolve_sort<C: Copy>(
    sort: Option<&str>,
    columns: &[(&str, C)],
) -> Result<Option<(C, SortDirection)>> {
    let Some(raw) = sort.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let (name, direction) = match raw.strip_prefix('-') {
        Some(name) => (name, SortDirection::Desc),
        None => (raw, SortDirection::Asc),
    };

    columns
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, column)| Some((*column, direction)))
        .ok_or_else(|| Error::InvalidSort {
            column: name.to_string(),
        })
}

fn apply_search<E, C>(select: Select<E>, q: Option<&str>, columns: &[C]) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    match q {
        Some(term) => {
            let pattern = format!("%{}%", escape_like(term));
            let condition = columns.iter().fold(Condition::any(), |cond, col| {
                cond.add(col.like(LikeExpr::new(pattern.as_str()).escape(LIKE_ESCAPE)))
            });
            select.filter(condition)
        }
        None => select,
    }
}

const LIKE_ESCAPE: char = '\\';

/// Makes `%`, `_` and the escape character match literally in a LIKE pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn apply_sort<E, C>(
    select: Select<E>,
    sort: Option<(C, SortDirection)>,
    default: C,
) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    match sort {
        Some((column, direction)) => select.order_by(column, direction.into()),
        None => select.order_by_asc(default),
    }
}

fn sort_rows<T>(rows: &mut [T], direction: SortDirection, key: impl Fn(&T) -> String) {
    rows.sort_by(|a, b| {
        let ordering = key(a).to_lowercase().cmp(&key(b).to_lowercase());
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

const COUNTRY_SORT: &[(&str, country::Column)] = &[
    ("name", country::Column::Name),
    ("iso2", country::Column::Iso2),
    ("created_date", country::Column::CreatedDate),
    ("modified_date", country::Column::ModifiedDate),
];

const STATE_SORT: &[(&str, state::Column)] = &[
    ("name", state::Column::Name),
    ("iso2", state::Column::Iso2),
    ("country_code", state::Column::CountryCode),
    ("created_date", state::Column::CreatedDate),
    ("modified_date", state::Column::ModifiedDate),
];

const CITY_SORT: &[(&str, city::Column)] = &[
    ("name", city::Column::Name),
    ("country_code", city::Column::CountryCode),
    ("state_code", city::Column::StateCode),
    ("created_date", city::Column::CreatedDate),
    ("modified_date", city::Column::ModifiedDate),
];

const TEAM_SORT: &[(&str, team_member::Column)] = &[
    ("name", team_member::Column::Name),
    ("designation", team_member::Column::Designation),
    ("facebook", team_member::Column::Facebook),
    ("twitter", team_member::Column::Twitter),
    ("photo", team_member::Column::Photo),
];

/// Sortable columns of the user listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserSort {
    FirstName,
    LastName,
    CountryOfResidence,
}

const USER_SORT: &[(&str, UserSort)] = &[
    ("first_name", UserSort::FirstName),
    ("last_name", UserSort::LastName),
    ("country_of_residence", UserSort::CountryOfResidence),
];

/// Sortable columns of the address listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressSort {
    User,
    AddressLine1,
    AddressLine2,
    State,
    City,
    ZipPostCode,
    Country,
}

const ADDRESS_SORT: &[(&str, AddressSort)] = &[
    ("user", AddressSort::User),
    ("address_line_1", AddressSort::AddressLine1),
    ("address_line_2", AddressSort::AddressLine2),
    ("state", AddressSort::State),
    ("city", AddressSort::City),
    ("zip_post_code", AddressSort::ZipPostCode),
    ("country", AddressSort::Country),
];

/// One line of the user listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRow {
    /// User id
    pub id: Uuid,
    /// Login email
    pub email: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Name of the residence country
    pub country_of_residence: Option<String>,
    /// KYC standing
    pub kyc_status: user::UserKycStatus,
    /// Staff flag
    pub is_staff: bool,
}

/// One line of the address listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAddressRow {
    /// Address id
    pub id: Uuid,
    /// Owner's email
    pub user: String,
    /// Address line 1
    pub address_line_1: String,
    /// Address line 2
    pub address_line_2: Option<String>,
    /// State or region
    pub state: String,
    /// City
    pub city: String,
    /// Zip or postal code
    pub zip_post_code: String,
    /// Country name
    pub country: String,
}

/// Countries, searchable by name and ISO2.
pub async fn list_countries(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> Result<Vec<country::Model>> {
    let sort = resolve_sort(query.sort.as_deref(), COUNTRY_SORT)?;
    let select = apply_search(
        Country::find(),
        query.search_term(),
        &[country::Column::Name, country::Column::Iso2],
    );
    apply_sort(select, sort, country::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// States, searchable by name, ISO2 and country code.
pub async fn list_states(db: &DatabaseConnection, query: &ListQuery) -> Result<Vec<state::Model>> {
    let sort = resolve_sort(query.sort.as_deref(), STATE_SORT)?;
    let select = apply_search(
        State::find(),
        query.search_term(),
        &[
            state::Column::Name,
            state::Column::Iso2,
            state::Column::CountryCode,
        ],
    );
    apply_sort(select, sort, state::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cities, searchable by name, country code and state code.
pub async fn list_cities(db: &DatabaseConnection, query: &ListQuery) -> Result<Vec<city::Model>> {
    let sort = resolve_sort(query.sort.as_deref(), CITY_SORT)?;
    let select = apply_search(
        City::find(),
        query.search_term(),
        &[
            city::Column::Name,
            city::Column::CountryCode,
            city::Column::StateCode,
        ],
    );
    apply_sort(select, sort, city::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Team members, searchable by name and designation.
pub async fn list_team(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> Result<Vec<team_member::Model>> {
    let sort = resolve_sort(query.sort.as_deref(), TEAM_SORT)?;
    let select = apply_search(
        TeamMember::find(),
        query.search_term(),
        &[team_member::Column::Name, team_member::Column::Designation],
    );
    apply_sort(select, sort, team_member::Column::CreatedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Users with their residence country, searchable by name and email.
pub async fn list_users(db: &DatabaseConnection, query: &ListQuery) -> Result<Vec<UserRow>> {
    let sort = resolve_sort(query.sort.as_deref(), USER_SORT)?;
    let select = apply_search(
        User::find(),
        query.search_term(),
        &[
            user::Column::FirstName,
            user::Column::LastName,
            user::Column::Email,
        ],
    );

    let mut rows: Vec<UserRow> = select
        .order_by_asc(user::Column::Email)
        .find_also_related(Country)
        .all(db)
        .await?
        .into_iter()
        .map(|(user, country)| UserRow {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            country_of_residence: country.map(|c| c.name),
            kyc_status: user.kyc_status,
            is_staff: user.is_staff,
        })
        .collect();

    if let Some((column, direction)) = sort {
        sort_rows(&mut rows, direction, |row| {
            let value = match column {
                UserSort::FirstName => &row.first_name,
                UserSort::LastName => &row.last_name,
                UserSort::CountryOfResidence => &row.country_of_residence,
            };
            value.clone().unwrap_or_default()
        });
    }
    Ok(rows)
}

/// User addresses with owner email and country name, searchable by the
/// address text fields.
pub async fn list_user_addresses(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> Result<Vec<UserAddressRow>> {
    let sort = resolve_sort(query.sort.as_deref(), ADDRESS_SORT)?;
    let select = apply_search(
        UserAddress::find(),
        query.search_term(),
        &[
            user_address::Column::AddressLine1,
            user_address::Column::AddressLine2,
            user_address::Column::State,
            user_address::Column::City,
            user_address::Column::ZipPostCode,
        ],
    );

    let addresses = select
        .order_by_asc(user_address::Column::AddressLine1)
        .find_also_related(User)
        .all(db)
        .await?;

    let country_ids: Vec<i64> = addresses.iter().map(|(a, _)| a.country_id).collect();
    let country_names: HashMap<i64, String> = Country::find()
        .filter(country::Column::Id.is_in(country_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut rows: Vec<UserAddressRow> = addresses
        .into_iter()
        .map(|(address, owner)| UserAddressRow {
            id: address.id,
            user: owner.map(|u| u.email).unwrap_or_default(),
            country: country_names
                .get(&address.country_id)
                .cloned()
                .unwrap_or_default(),
            address_line_1: address.address_line_1,
            address_line_2: address.address_line_2,
            state: address.state,
            city: address.city,
            zip_post_code: address.zip_post_code,
        })
        .collect();

    if let Some((column, direction)) = sort {
        sort_rows(&mut rows, direction, |row| match column {
            AddressSort::User => row.user.clone(),
            AddressSort::AddressLine1 => row.address_line_1.clone(),
            AddressSort::AddressLine2 => row.address_line_2.clone().unwrap_or_default(),
            AddressSort::State => row.state.clone(),
            AddressSort::City => row.city.clone(),
            AddressSort::ZipPostCode => row.zip_post_code.clone(),
            AddressSort::Country => row.country.clone(),
        });
    }
    Ok(rows)
}
