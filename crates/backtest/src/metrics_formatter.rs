#![allow(clippy::format_push_string)]

use crate::metrics::PerformanceMetrics;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────\n";

pub struct MetricsFormatter;

impl MetricsFormatter {
    #[must_use]
    pub fn format(metrics: &PerformanceMetrics) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str("                  PERFORMANCE METRICS                          \n");
        output.push_str(RULE_HEAVY);
        output.push('\n');

        // Portfolio
        output.push_str("Portfolio\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Total Return:          {:.2}%\n",
            metrics.total_return
        ));
        output.push_str(&format!(
            "Sharpe Ratio:          {:.4} ({})\n",
            metrics.sharpe_ratio,
            metrics.sharpe_rating()
        ));
        output.push_str(&format!(
            "Max Drawdown:          {:.2}% (${:.2})\n",
            metrics.max_drawdown, metrics.max_drawdown_value
        ));
        output.push('\n');

        // Trades
        output.push_str("Trade Statistics\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Total Trades:          {}\n", metrics.total_trades));

        if metrics.total_trades > 0 {
            output.push_str(&format!(
                "Win Rate:              {:.2}% ({} won / {} lost)\n",
                metrics.win_rate * 100.0,
                metrics.winning_trades,
                metrics.losing_trades
            ));
            output.push_str(&format!(
                "Average Win:           ${:.2}\n",
                metrics.average_win
            ));
            output.push_str(&format!(
                "Average Loss:          ${:.2}\n",
                metrics.average_loss
            ));
            output.push_str(&format!(
                "Largest Win:           ${:.2}\n",
                metrics.largest_win
            ));
            output.push_str(&format!(
                "Largest Loss:          ${:.2}\n",
                metrics.largest_loss
            ));
            output.push_str(&format!(
                "Profit Factor:         {:.2}\n",
                metrics.profit_factor
            ));
            output.push_str(&format!(
                "Risk/Reward:           {}\n",
                metrics.risk_reward_ratio()
            ));
            output.push_str(&format!(
                "Realized P&L:          ${:.2}\n",
                metrics.total_realized_pnl
            ));
        } else {
            output.push_str("Win Rate:              N/A (no trades)\n");
        }
        output.push('\n');

        // Holding
        output.push_str("Holding Period\n");
        output.push_str(RULE_LIGHT);
        if metrics.holding_pairs > 0 {
            output.push_str(&format!(
                "Average Hold:          {:.1} days ({} pairs)\n",
                metrics.average_holding_days, metrics.holding_pairs
            ));
        }
        output.push_str(&format!(
            "Style:                 {}\n",
            metrics.holding_period_description()
        ));

        output.push('\n');
        output.push_str(RULE_HEAVY);

        if metrics.total_trades == 0 {
            output.push_str("\nNo closed trades in this ledger.\n\n");
        }

        output
    }
}
