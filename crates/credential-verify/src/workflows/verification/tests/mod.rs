mod common;
mod parser;
mod service;
