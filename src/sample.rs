use crate::position::NewPosition;

/// A small diversified portfolio for trying the tool out.
pub fn sample_positions() -> Vec<NewPosition> {
    [
        ("AAPL", "Apple Inc.", 10.0, 175.25, "2023-01-15", "Technology"),
        ("MSFT", "Microsoft Corporation", 5.0, 320.75, "2023-02-10", "Technology"),
        ("JNJ", "Johnson & Johnson", 8.0, 165.50, "2023-03-05", "Healthcare"),
        ("JPM", "JPMorgan Chase & Co.", 7.0, 145.80, "2023-04-20", "Financial Services"),
        ("PG", "Procter & Gamble Co.", 12.0, 152.30, "2023-05-15", "Consumer Defensive"),
    ]
    .into_iter()
    .map(
        |(symbol, company_name, shares, purchase_price, purchase_date, sector)| NewPosition {
            symbol: symbol.to_string(),
            company_name: company_name.to_string(),
            shares,
            purchase_price,
            purchase_date: purchase_date.to_string(),
            sector: sector.to_string(),
        },
    )
    .collect()
}
