mod arbitration;
mod composition;
mod config;
mod defaults;
mod faults;
mod registration;
mod support;
