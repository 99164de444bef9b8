pub mod appointments;
pub mod health;
pub mod ipd;
pub mod khata;
pub mod lab;
