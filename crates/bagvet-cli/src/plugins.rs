//! # Plugins Subcommand
//!
//! Prints the descriptors of the bundled format plugins so operators
//! can see what each backend claims to validate before selecting one.

use clap::Args;

use bagvet_plugin::{ExtensionPlugin, FormatPlugin, JhoveConfig, JhovePlugin, PluginDescriptor};

/// Arguments for the `plugins` subcommand.
#[derive(Args, Debug)]
pub struct PluginsArgs {
    /// Print descriptors as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Execute the plugins subcommand.
///
/// The JHOVE descriptor is included only when the backend is actually
/// constructible from the environment; a missing tool is reported, not
/// an error, because listing plugins must work on any machine.
pub fn run_plugins(args: &PluginsArgs) -> anyhow::Result<u8> {
    let mut descriptors: Vec<PluginDescriptor> =
        vec![ExtensionPlugin::new().descriptor().clone()];

    match JhoveConfig::from_env().and_then(JhovePlugin::new) {
        Ok(plugin) => descriptors.push(plugin.descriptor().clone()),
        Err(e) => tracing::info!(error = %e, "jhove backend not available"),
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
    } else {
        for descriptor in &descriptors {
            println!("{}: {}", descriptor.name, descriptor.summary);
            println!("  {}", descriptor.description);
            println!("  formats: {}", descriptor.default_formats.join(", "));
        }
    }
    Ok(crate::EXIT_VALID)
}
