//! End-to-end tests across store, lifecycle, index and answering.

mod fakes;
