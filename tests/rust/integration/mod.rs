//! Integration tests - full query compilation against the city mapping fixture
//!
//! Every test compiles an abstract query into SQL and checks the rendered
//! statement and its parameters.


mod id_filter_tests;
mod pagination_tests;
mod selection_tests;
mod sorting_tests;
mod spatial_query_tests;
