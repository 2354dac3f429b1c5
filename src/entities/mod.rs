//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod city;
pub mod country;
pub mod kyc_application;
pub mod staff_permission;
pub mod state;
pub mod team_member;
pub mod user;
pub mod user_address;

// Re-export specific types to avoid conflicts
pub use city::{Column as CityColumn, Entity as City, Model as CityModel};
pub use country::{Column as CountryColumn, Entity as Country, Model as CountryModel};
pub use kyc_application::{
    Column as KycApplicationColumn, Entity as KycApplication, Model as KycApplicationModel,
};
pub use staff_permission::{
    Column as StaffPermissionColumn, Entity as StaffPermission, Model as StaffPermissionModel,
};
pub use state::{Column as StateColumn, Entity as State, Model as StateModel};
pub use team_member::{Column as TeamMemberColumn, Entity as TeamMember, Model as TeamMemberModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use user_address::{
    Column as UserAddressColumn, Entity as UserAddress, Model as UserAddressModel,
};
