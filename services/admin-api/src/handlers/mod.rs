pub mod dashboard;
pub mod health;
pub mod invitations;
pub mod orders;
pub mod parties;
pub mod products;
