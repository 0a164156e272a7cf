use schemars::schema_for;
use tender_core::filter::ItemFilter;
use tender_core::requests::{EstimateImport, MergeRequest, OfferImport, ResolveAlertRequest};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

const TYPE_NAMES: &[&str] = &[
    "estimate-import",
    "offer-import",
    "resolve-alert",
    "merge-request",
    "item-filter",
];

/// Handle `tnd schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = match args.type_name.as_str() {
        "estimate-import" => schema_for!(EstimateImport),
        "offer-import" => schema_for!(OfferImport),
        "resolve-alert" => schema_for!(ResolveAlertRequest),
        "merge-request" => schema_for!(MergeRequest),
        "item-filter" => schema_for!(ItemFilter),
        other => anyhow::bail!(
            "unknown schema type '{other}', expected one of: {}",
            TYPE_NAMES.join(", ")
        ),
    };
    output(&schema, flags.format)
}

#[cfg(test)]
mod tests {
    use super::{TYPE_NAMES, handle};
    use crate::cli::root_commands::SchemaArgs;
    use crate::cli::{GlobalFlags, OutputFormat};

    fn flags() -> GlobalFlags {
        GlobalFlags {
            format: OutputFormat::Raw,
            limit: None,
            quiet: true,
            verbose: false,
            config_dir: None,
        }
    }

    #[test]
    fn every_listed_type_renders() {
        for name in TYPE_NAMES {
            let args = SchemaArgs {
                type_name: (*name).to_string(),
            };
            assert!(handle(&args, &flags()).is_ok(), "{name} should render");
        }
    }

    #[test]
    fn unknown_type_lists_choices() {
        let args = SchemaArgs {
            type_name: "offer".into(),
        };
        let err = handle(&args, &flags()).expect_err("should fail");
        assert!(err.to_string().contains("offer-import"));
    }
}
