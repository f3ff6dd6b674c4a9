use color_eyre::eyre::Result;

/// Entry point for the vaultenv binary.
///
/// Installs the color-eyre report handler, then hands over to the CLI, which
/// parses arguments and runs the chosen command.
fn main() -> Result<()> {
    color_eyre::install()?;
    vaultenv::cli::main()
}
