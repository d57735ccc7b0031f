use std::{
    fs,
    path::{Path, PathBuf},
};

use minijinja::{context, Environment, Value};

use crate::{
    error::{Error, Result},
    history::HistoryTable,
    plot,
    series::{self, display_stat, BenchmarkSeries},
};

/// The template every configuration page is rendered from.
pub const TEMPLATE_NAME: &str = "benchmark-results-plot.html";

/// Default number of trailing runs averaged in the report.
pub const DEFAULT_WINDOW: usize = 30;

// The `.html` name turns on auto-escaping.
const TABLE_NAME: &str = "benchmark-table.html";
const TABLE_SOURCE: &str = r#"<table class="benchmarks">
<thead><tr><th>benchmark</th><th>last value</th><th>{{ window }}-run average</th><th>plot</th></tr></thead>
<tbody>
{% for row in rows -%}
<tr><td>{{ row.benchmark }}</td><td>{{ row.last_value }}</td><td>{{ row.trailing_average }}</td><td><img src="{{ row.chart|safe }}" alt="{{ row.benchmark }}"></td></tr>
{% endfor -%}
</tbody>
</table>"#;

/// One line of the summary table on a configuration page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReportRow {
    pub benchmark: String,
    pub last_value: String,
    pub trailing_average: String,
    /// Chart location relative to the page, built only from link-safe segments.
    pub chart: String,
}

impl ReportRow {
    fn new(series: &BenchmarkSeries, window: usize, chart: String) -> Self {
        ReportRow {
            benchmark: series.name.clone(),
            last_value: display_stat(series.last_value()),
            trailing_average: display_stat(series.trailing_mean(window)),
            chart,
        }
    }
}

/// Renders the charts and HTML page for a configuration's history table.
pub struct ReportRenderer {
    env: Environment<'static>,
    window: usize,
}

impl ReportRenderer {
    pub fn from_template_dir(template_dir: &Path, window: usize) -> Result<Self> {
        let template_path = template_dir.join(TEMPLATE_NAME);
        if !template_path.is_file() {
            return Err(Error::MissingTemplate(template_dir.to_path_buf()));
        }
        Self::from_source(fs::read_to_string(template_path)?, window)
    }

    pub fn from_source(source: String, window: usize) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(TABLE_NAME, TABLE_SOURCE)?;
        env.add_template_owned(TEMPLATE_NAME, source)?;
        Ok(ReportRenderer { env, window })
    }

    /// Writes `<results_dir>/plots/<run_type>/*.jpg` and `<results_dir>/<run_type>.html`,
    /// replacing whatever an earlier run left there. Returns the page path.
    pub fn render(
        &self,
        run_type: &str,
        table: &HistoryTable,
        results_dir: &Path,
    ) -> Result<PathBuf> {
        let plot_subdir = plot::link_safe(run_type);
        let plot_dir = results_dir.join("plots").join(&plot_subdir);
        clear_dir(&plot_dir)?;

        let all_series = series::series_from_table(table);
        let file_names = plot::chart_file_names(all_series.iter().map(|s| s.name.as_str()));
        let mut rows = vec![];
        for (s, file_name) in all_series.iter().zip(file_names) {
            plot::draw_series_chart(s, &plot_dir.join(&file_name))?;
            let chart = format!("plots/{}/{}", plot_subdir, file_name);
            rows.push(ReportRow::new(s, self.window, chart));
        }

        let page = self.render_page(run_type, table.last_date().unwrap_or_default(), &rows)?;
        let page_path = results_dir.join(format!("{}.html", run_type));
        fs::write(&page_path, page)?;
        Ok(page_path)
    }

    pub fn render_page(
        &self,
        run_type: &str,
        run_date: &str,
        rows: &[ReportRow],
    ) -> Result<String> {
        let table = self.env.get_template(TABLE_NAME)?.render(context! {
            window => self.window,
            rows => rows,
        })?;
        let page = self.env.get_template(TEMPLATE_NAME)?.render(context! {
            run_type => run_type,
            run_date => run_date,
            table_contents => Value::from_safe_string(table),
        })?;
        Ok(page)
    }
}

fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
