//! 年度模擬示例
//!
//! 用法：`cargo run --example yearly_run [config.json]`
//! 未指定配置時使用參考配置；`RUST_LOG=debug` 可看到各步驟日誌。

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use saddle_scm::{simulate, DateWindow, RunResult, ScenarioModifier, SimConfig};
use tracing_subscriber::{fmt, EnvFilter};

fn print_run(title: &str, run: &RunResult) {
    let show = |v: Option<Decimal>| v.map_or_else(|| "-".to_string(), |d| d.to_string());
    let m = &run.metrics;

    println!("=== {} ===", title);
    println!("  計劃量 / 完工量: {} / {}", m.planned_units, m.actual_units);
    println!("  計劃達成率: {}%", show(m.plan_attainment_pct));
    println!("  準時到貨率: {}%", show(m.on_time_delivery_pct));
    println!("  需求日前可用率: {}%", show(m.available_by_need_pct));
    println!("  平均提前期: {} 天", show(m.avg_lead_time_days));
    println!("  平均週期: {} 天", show(m.avg_cycle_time_days));
    println!("  物料可用率: {}%", show(m.material_availability_pct));
    println!("  平均庫存天數: {}", show(m.avg_days_of_supply));
    println!("  庫存周轉: {}", show(m.inventory_turnover));
    println!("  缺料天數: {}，欠量峰值: {}", m.shortfall_days, m.peak_backlog);
    println!("  訂單 {} 張，警告 {} 則", run.orders.len(), run.warnings.len());

    for (component_id, cm) in &m.components {
        println!(
            "    - {}: 批次 {}（準時 {}），缺料 {} 天，欠量峰值 {}",
            component_id, cm.lots, cm.on_time_lots, cm.shortfall_days, cm.peak_backlog
        );
    }
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::from_json_file(&path)
            .with_context(|| format!("無法讀取配置 {}", path))?,
        None => SimConfig::reference(2027),
    };

    // 六月出港延誤一週
    let june = DateWindow::new(
        NaiveDate::from_ymd_opt(config.year, 6, 1).context("無效的年度")?,
        NaiveDate::from_ymd_opt(config.year, 6, 30).context("無效的年度")?,
    );
    let scenarios = [ScenarioModifier::shipping_delay(june, vec![], 7)];

    let output = simulate(&config, &scenarios)?;
    print_run("基準", &output.baseline);
    if let Some(scenario) = &output.scenario {
        println!();
        print_run("情境：六月海運延誤 7 天", scenario);
    }

    Ok(())
}
