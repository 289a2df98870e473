mod contexts;
mod failures;
mod ledger;
mod runs;
mod validation;
