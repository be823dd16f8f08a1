use matrixflow_api_models::ReportSummary;
use matrixflow_core::DateRange;

use crate::cli::{OutputFormat, ReportArgs};
use crate::client::{AppContext, CliResult, read_json, send};
use crate::output::render_report;

pub(crate) async fn fetch_report(ctx: &AppContext, range: &DateRange) -> CliResult<ReportSummary> {
    let mut url = ctx.endpoint(&["api", "reports", "summary"])?;
    if !range.is_unbounded() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in range.query_pairs() {
            pairs.append_pair(key, &value);
        }
    }
    let response = send(ctx.authorized(ctx.client.get(url))?, "/api/reports/summary").await?;
    read_json(response, "report summary").await
}

pub(crate) async fn handle_report(
    ctx: &AppContext,
    args: ReportArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let range = DateRange::parse(args.from.as_deref(), args.to.as_deref())?;
    let mut report = fetch_report(ctx, &range).await?;
    report.top_apps.truncate(args.top);
    report.top_titles.truncate(args.top);
    render_report(&report, output)
}
