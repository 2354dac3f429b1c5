//! Geography business logic - Countries, states and cities.
//!
//! Countries are the anchor of every address and KYC record. States and
//! cities copy the codes of their parents on insert so listings do not need
//! joins. A country cannot be deleted while states, cities, user addresses or
//! KYC jurisdictions still point at it.

use crate::{
    config::seed::CountrySeed,
    entities::{
        City, Country, KycApplication, State, UserAddress, city, country, kyc_application, state,
        user_address,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use validator::Validate;

const fn default_true() -> bool {
    true
}

/// Input for a new country
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct NewCountry {
    /// English name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// International dialing code
    #[validate(length(max = 100))]
    pub phone_code: Option<String>,
    /// Official currency
    #[validate(length(max = 50))]
    pub currency: Option<String>,
    /// Two-letter ISO code, stored upper-case
    #[validate(length(equal = 2))]
    pub iso2: Option<String>,
    /// Name in the country's own language
    #[validate(length(max = 255))]
    pub native: Option<String>,
    /// Whether residents may sign up (defaults to true)
    #[serde(default = "default_true")]
    pub accept_signup: bool,
    /// Whether the country is banned (defaults to false)
    #[serde(default)]
    pub banned: bool,
}

impl NewCountry {
    /// A signup-enabled country with only a name and ISO2 code.
    pub fn named(name: impl Into<String>, iso2: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_code: None,
            currency: None,
            iso2: Some(iso2.into()),
            native: None,
            accept_signup: true,
            banned: false,
        }
    }
}

/// Input for a new state or region
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct NewState {
    /// Name of the state
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// State code within the country
    #[validate(length(max = 5))]
    pub iso2: Option<String>,
    /// Owning country
    pub country_id: i64,
}

/// Input for a new city; the country is taken from the state
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct NewCity {
    /// Name of the city
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Owning state
    pub state_id: i64,
}

/// Counts of rows inserted by [`seed_locations`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Countries inserted
    pub countries: usize,
    /// States inserted
    pub states: usize,
    /// Cities inserted
    pub cities: usize,
}

/// Creates a country after validating its fields.
///
/// The ISO2 code is trimmed and upper-cased; a second country with the same
/// code is rejected.
#[instrument(skip(db))]
pub async fn create_country<C>(db: &C, new: NewCountry) -> Result<country::Model>
where
    C: ConnectionTrait,
{
    new.validate()?;
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Country name cannot be empty"));
    }

    let iso2 = new.iso2.as_deref().map(|code| code.trim().to_uppercase());
    if let Some(code) = iso2.as_deref() {
        if get_country_by_iso2(db, code).await?.is_some() {
            return Err(Error::validation(format!(
                "A country with ISO2 code '{code}' already exists"
            )));
        }
    }

    let now = Utc::now();
    let country = country::ActiveModel {
        name: Set(name.to_string()),
        phone_code: Set(new.phone_code),
        currency: Set(new.currency),
        iso2: Set(iso2),
        native: Set(new.native),
        created_date: Set(now),
        modified_date: Set(now),
        accept_signup: Set(new.accept_signup),
        banned: Set(new.banned),
        ..Default::default()
    };

    let result = country.insert(db).await?;
    debug!("Created country {} ({})", result.name, result.id);
    Ok(result)
}

/// Creates a state inside an existing country, copying the country's ISO2 code.
#[instrument(skip(db))]
pub async fn create_state<C>(db: &C, new: NewState) -> Result<state::Model>
where
    C: ConnectionTrait,
{
    new.validate()?;
    let country = get_country_by_id(db, new.country_id)
        .await?
        .ok_or_else(|| Error::not_found("Country", new.country_id))?;

    let now = Utc::now();
    let state = state::ActiveModel {
        name: Set(new.name.trim().to_string()),
        country_code: Set(country.iso2.unwrap_or_default()),
        iso2: Set(new.iso2.map(|code| code.trim().to_uppercase())),
        created_date: Set(now),
        modified_date: Set(now),
        country_id: Set(country.id),
        ..Default::default()
    };

    state.insert(db).await.map_err(Into::into)
}

/// Creates a city inside an existing state. The city's country and codes are
/// taken from the state, so the two can never disagree.
#[instrument(skip(db))]
pub async fn create_city<C>(db: &C, new: NewCity) -> Result<city::Model>
where
    C: ConnectionTrait,
{
    new.validate()?;
    let state = State::find_by_id(new.state_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("State", new.state_id))?;

    let now = Utc::now();
    let city = city::ActiveModel {
        name: Set(new.name.trim().to_string()),
        country_code: Set(state.country_code),
        state_code: Set(state.iso2),
        created_date: Set(now),
        modified_date: Set(now),
        country_id: Set(state.country_id),
        state_id: Set(state.id),
        ..Default::default()
    };

    city.insert(db).await.map_err(Into::into)
}

/// Finds a country by primary key.
pub async fn get_country_by_id<C>(db: &C, country_id: i64) -> Result<Option<country::Model>>
where
    C: ConnectionTrait,
{
    Country::find_by_id(country_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a country by its ISO2 code, ignoring case.
pub async fn get_country_by_iso2<C>(db: &C, iso2: &str) -> Result<Option<country::Model>>
where
    C: ConnectionTrait,
{
    Country::find()
        .filter(country::Column::Iso2.eq(iso2.trim().to_uppercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Countries users may register from: accepting signups and not banned,
/// ordered by name.
pub async fn list_signup_countries(db: &DatabaseConnection) -> Result<Vec<country::Model>> {
    Country::find()
        .filter(country::Column::AcceptSignup.eq(true))
        .filter(country::Column::Banned.eq(false))
        .order_by_asc(country::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// States of a country, ordered by name.
pub async fn list_states_for_country(
    db: &DatabaseConnection,
    country_id: i64,
) -> Result<Vec<state::Model>> {
    State::find()
        .filter(state::Column::CountryId.eq(country_id))
        .order_by_asc(state::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cities of a state, ordered by name.
pub async fn list_cities_for_state(
    db: &DatabaseConnection,
    state_id: i64,
) -> Result<Vec<city::Model>> {
    City::find()
        .filter(city::Column::StateId.eq(state_id))
        .order_by_asc(city::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a country that nothing protects.
///
/// States, cities, user addresses and KYC jurisdictions protect the country;
/// if any exist the delete is refused with [`Error::CountryInUse`]. Residence
/// references on users are cleared and KYC applications citing the country as
/// citizenship or residence are removed by the database.
#[instrument(skip(db))]
pub async fn delete_country(db: &DatabaseConnection, country_id: i64) -> Result<()> {
    if get_country_by_id(db, country_id).await?.is_none() {
        return Err(Error::not_found("Country", country_id));
    }

    let states = State::find()
        .filter(state::Column::CountryId.eq(country_id))
        .count(db)
        .await?;
    let cities = City::find()
        .filter(city::Column::CountryId.eq(country_id))
        .count(db)
        .await?;
    let addresses = UserAddress::find()
        .filter(user_address::Column::CountryId.eq(country_id))
        .count(db)
        .await?;
    let kyc_jurisdictions = KycApplication::find()
        .filter(kyc_application::Column::KycCountryId.eq(country_id))
        .count(db)
        .await?;

    let references = states + cities + addresses + kyc_jurisdictions;
    if references > 0 {
        return Err(Error::CountryInUse {
            country_id,
            references,
        });
    }

    Country::delete_by_id(country_id).exec(db).await?;
    info!("Deleted country {}", country_id);
    Ok(())
}

/// Inserts seed countries with their states and cities.
///
/// Countries whose ISO2 code (or name, when no code is given) already exists
/// are skipped together with their nested entries, so running the seed twice
/// inserts nothing the second time. Each country is inserted with its states
/// and cities in one transaction; a failing entry leaves no part of that
/// country behind.
#[instrument(skip_all, fields(countries = seeds.len()))]
pub async fn seed_locations(db: &DatabaseConnection, seeds: &[CountrySeed]) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for seed in seeds {
        let existing = match seed.country.iso2.as_deref() {
            Some(code) => get_country_by_iso2(db, code).await?,
            None => {
                Country::find()
                    .filter(country::Column::Name.eq(seed.country.name.trim()))
                    .one(db)
                    .await?
            }
        };
        if existing.is_some() {
            debug!("Country '{}' already present, skipping", seed.country.name);
            continue;
        }

        let txn = db.begin().await?;
        let seeded = seed_country(&txn, seed).await?;
        txn.commit().await?;

        summary.countries += seeded.countries;
        summary.states += seeded.states;
        summary.cities += seeded.cities;
    }

    info!(
        "Seeded {} countries, {} states, {} cities",
        summary.countries, summary.states, summary.cities
    );
    Ok(summary)
}

async fn seed_country<C>(db: &C, seed: &CountrySeed) -> Result<SeedSummary>
where
    C: ConnectionTrait,
{
    let country = create_country(db, seed.country.clone()).await?;
    let mut summary = SeedSummary {
        countries: 1,
        ..SeedSummary::default()
    };

    for state_seed in &seed.states {
        let state = create_state(
            db,
            NewState {
                name: state_seed.name.clone(),
                iso2: state_seed.iso2.clone(),
                country_id: country.id,
            },
        )
        .await?;
        summary.states += 1;

        for city_name in &state_seed.cities {
            create_city(
                db,
                NewCity {
                    name: city_name.clone(),
                    state_id: state.id,
                },
            )
            .await?;
            summary.cities += 1;
        }
    }

    Ok(summary)
}
