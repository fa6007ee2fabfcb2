//! Literature analysis report prompt.
//!
//! The model receives the aggregate distributions plus a compact listing of
//! every paper and is asked for one standalone HTML page.

use crate::analysis::Statistics;
use crate::record::PaperRecord;

/// Titles and keyword lines quoted as samples
const SAMPLE_SIZE: usize = 15;

/// Venues and keywords listed in the distribution sections
const TOP_N: usize = 10;

/// Report requirements. Placeholder: {total}
pub const REPORT_REQUIREMENTS: &str = r#"=== 报告要求 ===
请生成一个完整、可独立打开的 HTML 页面（内嵌 CSS 与 JavaScript，依赖通过 CDN 引入），包含：

1. 页面结构：现代化响应式布局，带导航栏。
2. 可视化图表（使用 Chart.js）：
   - 发表年份趋势图
   - 来源期刊分布图
   - 关键词频次图
   - 被引次数分布图
3. 分析内容：研究主题与热点、时间趋势、期刊分布、核心作者与合作情况、研究方法概述。
4. 文献清单：包含全部 {total} 篇文献的表格，支持搜索与排序，显示题名、作者、来源、发表时间、被引次数。
5. 研究建议：基于数据的未来研究方向与研究空白。

只输出 HTML 代码，内容使用中文。"#;

fn format_counts<K: std::fmt::Display>(counts: impl IntoIterator<Item = (K, usize)>) -> String {
    counts
        .into_iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the report prompt for `records`.
pub fn build_report_prompt(records: &[PaperRecord], stats: &Statistics) -> String {
    let span = stats
        .year_span()
        .map(|(first, last)| format!("{} - {}", first, last))
        .unwrap_or_else(|| "未知".to_string());

    let titles: Vec<&str> = records
        .iter()
        .map(|r| r.title.as_str())
        .filter(|t| !t.is_empty())
        .take(SAMPLE_SIZE)
        .collect();

    let keyword_lines: Vec<&str> = records
        .iter()
        .map(|r| r.keywords.as_str())
        .filter(|k| !k.is_empty())
        .take(SAMPLE_SIZE)
        .collect();

    let listing: Vec<String> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {} - {} - {} - {} - 被引 {}",
                i + 1,
                r.title,
                r.authors,
                r.source,
                r.date,
                r.citations
            )
        })
        .collect();

    format!(
        "请分析以下学术文献数据，并生成可视化 HTML 报告。\n\n\
         === 数据概览 ===\n\
         文献总数: {total}\n\
         发表年份范围: {span}\n\n\
         === 年份分布 ===\n{years}\n\n\
         === 来源分布（前 {top}） ===\n{venues}\n\n\
         === 关键词频次（前 {top}） ===\n{keywords}\n\n\
         === 被引次数分布 ===\n{citations}\n\n\
         === 文献标题样例 ===\n{titles}\n\n\
         === 关键词样例 ===\n{keyword_lines}\n\n\
         === 文献清单 ===\n{listing}\n\n\
         {requirements}\n",
        total = stats.total,
        span = span,
        years = format_counts(stats.year_counts.iter().map(|(y, c)| (y, *c))),
        top = TOP_N,
        venues = format_counts(stats.top_venues(TOP_N)),
        keywords = format_counts(stats.top_keywords(TOP_N)),
        citations = format_counts(stats.citation_buckets()),
        titles = titles.join("\n"),
        keyword_lines = keyword_lines.join("\n"),
        listing = listing.join("\n"),
        requirements = REPORT_REQUIREMENTS.replace("{total}", &stats.total.to_string()),
    )
}
