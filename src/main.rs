// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use fee_estimator::{
    format_clp, format_uf, init_logging, EstimatorConfig, FormState, IndexRateProvider, Tier,
};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Command-line flags shared by both modes
#[derive(Debug, Default)]
struct CliArgs {
    quote: bool,
    config: Option<PathBuf>,
    category: Option<String>,
    area: Option<String>,
    index_rate: Option<String>,
    surcharge: Option<String>,
    construction_cost: Option<String>,
    fetch: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("Missing value for {}", name))
        };

        match arg.as_str() {
            "quote" => cli.quote = true,
            "--fetch" => cli.fetch = true,
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--category" => cli.category = Some(value("--category")?),
            "--area" => cli.area = Some(value("--area")?),
            "--uf" => cli.index_rate = Some(value("--uf")?),
            "--surcharge" => cli.surcharge = Some(value("--surcharge")?),
            "--construction-cost" => cli.construction_cost = Some(value("--construction-cost")?),
            other => bail!("Unknown argument: {}", other),
        }
    }

    Ok(cli)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    let config = EstimatorConfig::load(cli.config.as_deref())?;

    if cli.quote {
        // Quote mode
        init_logging("info");
        run_quote(&cli, &config)?;
    } else {
        // UI mode (default); logs would tear the alternate screen
        init_logging("off");
        run_ui_mode(&config)?;
    }

    Ok(())
}

fn build_form(cli: &CliArgs, config: &EstimatorConfig) -> Result<FormState> {
    let mut form = FormState::from_config(config).context("Invalid form defaults")?;

    if let Some(category) = &cli.category {
        form.set_category(category)?;
    }
    if let Some(area) = &cli.area {
        form.set_area_input(area);
    }
    if let Some(rate) = &cli.index_rate {
        form.set_index_rate_input(rate);
    }
    if let Some(surcharge) = &cli.surcharge {
        form.set_surcharge_input(surcharge);
    }
    if let Some(cost) = &cli.construction_cost {
        form.set_construction_unit_cost_input(cost);
    }

    Ok(form)
}

fn render_quote(form: &FormState) -> String {
    let mut out = String::new();

    out.push_str(&format!("Tipo / destino: {}\n", form.selected_category()));
    out.push_str(&format!("Rango UF/m²: {}\n", form.rate_band_line()));
    out.push_str(&format!("Valor UF: {}\n\n", format_clp(form.index_rate())));

    for tier in Tier::ALL {
        let fee = form.estimates().get(tier);
        out.push_str(&format!(
            "{:<6} {:>14}  {:>16}   {}\n",
            tier.label(),
            format_uf(fee.total_units),
            format_clp(fee.total_currency),
            form.basis_line(tier)
        ));
    }

    if let Some(reference) = form.construction_reference() {
        out.push_str(&format!(
            "\nReferencia de obra: {} (no se usa en el cálculo de honorarios)\n",
            format_clp(reference)
        ));
    }

    out
}

fn run_quote(cli: &CliArgs, config: &EstimatorConfig) -> Result<()> {
    let mut form = build_form(cli, config)?;

    if cli.fetch {
        let provider = IndexRateProvider::new(config.index_endpoint.clone());
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

        if let Err(e) = runtime.block_on(form.fetch_index_rate(&provider)) {
            warn!("Automatic index rate unavailable: {}", e);
            eprintln!("{}", e.user_notice());
        }
    }

    print!("{}", render_quote(&form));
    println!("\nSolicitar cotización: {}", config.mailto());

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &EstimatorConfig) -> Result<()> {
    let form = FormState::from_config(config).context("Invalid form defaults")?;
    let provider = IndexRateProvider::new(config.index_endpoint.clone());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let mut app = ui::App::new(form, provider, config.mailto());
    ui::run_ui(&mut app, runtime.handle())?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &EstimatorConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print a quote: fee-estimator quote --area 120");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("fee-estimator")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_quote_args() {
        let cli = parse_args(&args(&[
            "quote", "--category", "Vivienda económica", "--area", "80", "--surcharge", "10", "--fetch",
        ]))
        .unwrap();

        assert!(cli.quote);
        assert!(cli.fetch);
        assert_eq!(cli.category.as_deref(), Some("Vivienda económica"));
        assert_eq!(cli.area.as_deref(), Some("80"));
        assert_eq!(cli.surcharge.as_deref(), Some("10"));
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing_values() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["quote", "--area"])).is_err());
    }

    #[test]
    fn test_quote_output() {
        let cli = parse_args(&args(&["quote", "--surcharge", "20", "--construction-cost", "600000"])).unwrap();
        let form = build_form(&cli, &EstimatorConfig::default()).unwrap();
        let text = render_quote(&form);

        assert!(text.contains("Tipo / destino: Vivienda unifamiliar"));
        assert!(text.contains("108.000 UF"));
        assert!(text.contains("recargo: 20%"));
        assert!(text.contains("Referencia de obra: $60.000.000"));
    }

    #[test]
    fn test_quote_without_construction_cost_has_no_reference() {
        let cli = parse_args(&args(&["quote", "--area", "100", "--uf", "39428"])).unwrap();
        let form = build_form(&cli, &EstimatorConfig::default()).unwrap();
        let text = render_quote(&form);

        assert!(text.contains("$3.942.800"));
        assert!(!text.contains("Referencia de obra"));
    }

    #[test]
    fn test_unknown_category_flag_is_an_error() {
        let cli = parse_args(&args(&["quote", "--category", "Bodega"])).unwrap();
        assert!(build_form(&cli, &EstimatorConfig::default()).is_err());
    }
}
