pub mod controller;
pub mod domain;
pub mod model;
pub mod prompt;
pub mod stats;
pub mod table;
pub mod ui;
