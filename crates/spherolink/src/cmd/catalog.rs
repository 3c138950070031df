use spherolink_frame::{CatalogEntry, CATALOG, DID_CORE, DID_SPHERO};

use crate::cmd::CatalogArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_catalog, OutputFormat};

pub fn run(args: CatalogArgs, format: OutputFormat) -> CliResult<i32> {
    let entries = filter_entries(args.device.as_deref())?;
    print_catalog(&entries, format);
    Ok(SUCCESS)
}

fn filter_entries(device: Option<&str>) -> CliResult<Vec<CatalogEntry>> {
    let device_id = match device.map(str::to_ascii_lowercase).as_deref() {
        None => return Ok(CATALOG.to_vec()),
        Some("core") => DID_CORE,
        Some("sphero") => DID_SPHERO,
        Some(other) => {
            return Err(CliError::new(
                USAGE,
                format!("unknown device {other:?} (expected core or sphero)"),
            ))
        }
    };
    Ok(CATALOG
        .iter()
        .copied()
        .filter(|e| e.device_id == device_id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_device() {
        let all = filter_entries(None).unwrap();
        let core = filter_entries(Some("core")).unwrap();
        let sphero = filter_entries(Some("SPHERO")).unwrap();

        assert_eq!(core.len() + sphero.len(), all.len());
        assert!(core.iter().all(|e| e.device_id == DID_CORE));
        assert!(sphero.iter().any(|e| e.name == "roll"));
        assert_eq!(filter_entries(Some("toaster")).unwrap_err().code, USAGE);
    }
}
