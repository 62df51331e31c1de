use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{Dataset, DatasetList, ListResult, Resource};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_resource(resource: &Resource) -> io::Result<()> {
        Self::print_json(resource)
    }

    pub fn print_datasets(result: &DatasetList) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_dataset(dataset: &Dataset) -> io::Result<()> {
        Self::print_json(dataset)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
