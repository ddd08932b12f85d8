//! HTML statement-analysis report template.

use std::fmt::Write as _;

use chrono::Utc;

use crate::analysis::StatementAnalysis;

/// Render the full HTML report for a statement analysis, with the pie chart
/// embedded as a base64 data URI.
pub fn statement_report(recipient: &str, analysis: &StatementAnalysis, chart_base64: &str) -> String {
    let mut category_rows = String::new();
    for cat in &analysis.spending_categories {
        let _ = write!(
            category_rows,
            "<tr>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0;\">{}</td>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0; text-align: right;\">AED {:.2}</td>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0; text-align: right;\">{:.1}%</td>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0; text-align: center;\">{}</td>\
             </tr>",
            cat.category, cat.amount, cat.percentage, cat.transaction_count
        );
    }

    let mut top_categories = String::new();
    for cat in &analysis.top_categories {
        let _ = write!(
            top_categories,
            "<li style=\"margin: 8px 0; color: #555;\">{cat}</li>"
        );
    }

    let mut frequent_rows = String::new();
    for tx in &analysis.most_frequent_transactions {
        let _ = write!(
            frequent_rows,
            "<tr>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0;\">{}</td>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0; text-align: center;\">{}</td>\
             <td style=\"padding: 12px; border-bottom: 1px solid #e0e0e0; text-align: right;\">AED {:.2}</td>\
             </tr>",
            tx.merchant, tx.count, tx.total_amount
        );
    }

    let mut recommendation_cards = String::new();
    for card in &analysis.recommendations {
        let _ = write!(
            recommendation_cards,
            "<div style=\"background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); \
             border-radius: 12px; padding: 20px; margin: 15px 0; color: white;\">\
             <h3 style=\"margin: 0 0 10px 0; font-size: 22px;\">{}</h3>\
             <p style=\"margin: 5px 0; opacity: 0.9;\"><strong>Bank:</strong> {}</p>\
             <p style=\"margin: 5px 0; opacity: 0.9;\"><strong>Annual Fee:</strong> {}</p>\
             <p style=\"margin: 5px 0; opacity: 0.9;\"><strong>Cashback Rate:</strong> {}</p>\
             <p style=\"margin: 10px 0 0 0; line-height: 1.6;\">{}</p>\
             </div>",
            card.card_name, card.bank, card.annual_fee, card.cashback_rate, card.benefits
        );
    }

    let generated_on = Utc::now().format("%B %-d, %Y");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Credit Card Statement Analysis</title>
</head>
<body style="margin: 0; padding: 0; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #f5f5f5;">
  <div style="max-width: 800px; margin: 0 auto; background-color: white;">
    <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 40px 20px; text-align: center; color: white;">
      <h1 style="margin: 0; font-size: 32px; font-weight: bold;">Credit Card Statement Analysis</h1>
      <p style="margin: 10px 0 0 0; font-size: 16px; opacity: 0.9;">Comprehensive Spending Report</p>
    </div>
    <div style="padding: 30px;">
      <p style="font-size: 16px; color: #333; line-height: 1.6;">Dear {recipient},</p>
      <p style="font-size: 16px; color: #333; line-height: 1.6;">
        Thank you for using our Digital Employee service. We've analyzed your credit card statement
        and prepared a comprehensive report with insights and recommendations.
      </p>
      <div style="display: grid; grid-template-columns: repeat(2, 1fr); gap: 20px; margin: 30px 0;">
        <div style="background: #f8f9fa; border-radius: 10px; padding: 20px; text-align: center; border-left: 4px solid #667eea;">
          <div style="font-size: 14px; color: #666; margin-bottom: 5px;">Total Spend</div>
          <div style="font-size: 28px; font-weight: bold; color: #333;">AED {total_spend:.2}</div>
        </div>
        <div style="background: #f8f9fa; border-radius: 10px; padding: 20px; text-align: center; border-left: 4px solid #764ba2;">
          <div style="font-size: 14px; color: #666; margin-bottom: 5px;">Avg Transaction</div>
          <div style="font-size: 28px; font-weight: bold; color: #333;">AED {average:.2}</div>
        </div>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Spending Breakdown</h2>
        <div style="text-align: center; background: #f8f9fa; padding: 20px; border-radius: 10px;">
          <img src="data:image/png;base64,{chart_base64}" alt="Spending Chart" style="max-width: 100%; height: auto;" />
        </div>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Spending by Category</h2>
        <table style="width: 100%; border-collapse: collapse; background: white;">
          <thead>
            <tr style="background: #667eea; color: white;">
              <th style="padding: 15px; text-align: left;">Category</th>
              <th style="padding: 15px; text-align: right;">Amount</th>
              <th style="padding: 15px; text-align: right;">Percentage</th>
              <th style="padding: 15px; text-align: center;">Transactions</th>
            </tr>
          </thead>
          <tbody>{category_rows}</tbody>
        </table>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Top Spending Categories</h2>
        <ul style="background: #f8f9fa; padding: 20px 40px; border-radius: 10px; line-height: 1.8;">{top_categories}</ul>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Most Frequent Transactions</h2>
        <table style="width: 100%; border-collapse: collapse; background: white;">
          <thead>
            <tr style="background: #764ba2; color: white;">
              <th style="padding: 15px; text-align: left;">Merchant</th>
              <th style="padding: 15px; text-align: center;">Count</th>
              <th style="padding: 15px; text-align: right;">Total Amount</th>
            </tr>
          </thead>
          <tbody>{frequent_rows}</tbody>
        </table>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Spending Analysis</h2>
        <div style="background: #f8f9fa; padding: 20px; border-radius: 10px; line-height: 1.8; color: #555;">{analysis_text}</div>
      </div>
      <div style="margin: 30px 0;">
        <h2 style="color: #333; font-size: 24px; border-bottom: 2px solid #667eea; padding-bottom: 10px;">Recommended Credit Cards for UAE</h2>
        <p style="color: #666; margin-bottom: 20px; line-height: 1.6;">
          Based on your spending patterns, here are the best credit card options available in the UAE market:
        </p>
        {recommendation_cards}
      </div>
    </div>
    <div style="background: #f8f9fa; padding: 30px 20px; text-align: center; border-top: 1px solid #e0e0e0;">
      <p style="margin: 0; color: #666; font-size: 14px;">
        This analysis was generated by your Digital Employee<br>
        Powered by AI &bull; {generated_on}
      </p>
    </div>
  </div>
</body>
</html>
"#,
        total_spend = analysis.total_spend,
        average = analysis.average_transaction_amount,
        analysis_text = analysis.analysis,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CardRecommendation, FrequentTransaction, SpendingCategory};

    fn sample_analysis() -> StatementAnalysis {
        StatementAnalysis {
            spending_categories: vec![SpendingCategory {
                category: "Dining".into(),
                amount: 850.0,
                percentage: 42.5,
                transaction_count: 17,
            }],
            top_categories: vec!["Dining".into(), "Travel".into()],
            most_frequent_transactions: vec![FrequentTransaction {
                merchant: "Zomato".into(),
                count: 9,
                total_amount: 410.0,
            }],
            total_spend: 2000.0,
            average_transaction_amount: 87.5,
            analysis: "Dining dominates this statement.".into(),
            recommendations: vec![CardRecommendation {
                card_name: "Dining Rewards".into(),
                bank: "Mashreq".into(),
                benefits: "10% dining cashback".into(),
                annual_fee: "AED 315".into(),
                cashback_rate: "10%".into(),
            }],
        }
    }

    #[test]
    fn report_embeds_all_sections() {
        let html = statement_report("alice@example.com", &sample_analysis(), "QUVE");
        assert!(html.contains("Dear alice@example.com,"));
        assert!(html.contains("AED 2000.00"));
        assert!(html.contains("AED 87.50"));
        assert!(html.contains("data:image/png;base64,QUVE"));
        assert!(html.contains("Dining"));
        assert!(html.contains("42.5%"));
        assert!(html.contains("Zomato"));
        assert!(html.contains("Dining dominates this statement."));
        assert!(html.contains("Mashreq"));
    }

    #[test]
    fn report_is_complete_html_document() {
        let html = statement_report("x@y.z", &sample_analysis(), "");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
