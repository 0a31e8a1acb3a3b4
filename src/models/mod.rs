pub mod pulumi;
pub mod site;
