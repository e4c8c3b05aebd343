pub mod bar;
pub mod forecast;
pub mod series;
