pub mod transit_source;
