mod common;
mod draft;
mod schema;
mod validation;
