pub mod definition;
pub mod instance;
pub mod location;
pub mod property;
pub mod verification;
pub mod view;
pub mod worker;
