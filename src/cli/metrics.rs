use crate::analysis::Analyzer;
use crate::cli::commands::MetricsArgs;
use crate::errors::GuardianError;

pub async fn handle_metrics(args: MetricsArgs) -> Result<(), GuardianError> {
    let (config, _) = super::load_config(args.config.as_deref()).await?;
    let analyzer = Analyzer::open(&config).await?;

    let snapshot = analyzer.metrics().await?;
    let state = analyzer.stm_state().await;

    println!("Pipelines analyzed:   {}", snapshot.total_pipelines_analyzed);
    println!("Critical incidents:   {}", snapshot.critical_incidents);
    println!("High severity:        {}", snapshot.high_severity_incidents);
    println!("Medium severity:      {}", snapshot.medium_severity_incidents);
    println!("Low severity:         {}", snapshot.low_severity_incidents);
    println!("Clean runs:           {}", snapshot.clean_incidents);
    println!("Success rate:         {:.2}%", snapshot.success_rate_percent);
    println!("Average duration:     {:.2}s", snapshot.average_duration_seconds);
    if let Some(at) = state.last_analyzed {
        println!("Last analysis:        {}", at.to_rfc3339());
    }
    if !snapshot.top_anomalies.is_empty() {
        println!("Top anomalies:");
        for anomaly in &snapshot.top_anomalies {
            println!("  {:<30} {}", anomaly.kind, anomaly.count);
        }
    }
    Ok(())
}
