pub mod results;
pub mod submit;
