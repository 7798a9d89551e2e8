/// A single row predicate, rendered as a PostgREST query pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(String, String),
    Gte(String, String),
    Lte(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    /// Case-insensitive substring match OR-ed across columns
    AnyIlike(Vec<String>, String),
}

impl Predicate {
    fn to_pair(&self) -> (String, String) {
        match self {
            Predicate::Eq(col, v) => (col.clone(), format!("eq.{v}")),
            Predicate::Gte(col, v) => (col.clone(), format!("gte.{v}")),
            Predicate::Lte(col, v) => (col.clone(), format!("lte.{v}")),
            Predicate::In(col, values) => (col.clone(), format!("in.({})", quote_list(values))),
            Predicate::NotIn(col, values) => {
                (col.clone(), format!("not.in.({})", quote_list(values)))
            }
            Predicate::AnyIlike(cols, term) => {
                let pattern = quote_value(&format!("*{term}*"));
                let alternatives = cols
                    .iter()
                    .map(|col| format!("{col}.ilike.{pattern}"))
                    .collect::<Vec<_>>()
                    .join(",");
                ("or".to_string(), format!("({alternatives})"))
            }
        }
    }
}

const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\'];

/// Quote a value for use inside `in.(...)` lists and `or=(...)` trees.
fn quote_value(value: &str) -> String {
    if value.contains(RESERVED) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_value(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Strip pattern wildcards so user text is matched literally.
pub fn literal_search_term(raw: &str) -> String {
    raw.trim().replace(['*', '%'], "")
}

/// A read request against one table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    predicates: Vec<Predicate>,
    order: Vec<(String, bool)>,
    offset: Option<usize>,
    limit: Option<usize>,
    count_exact: bool,
    single: bool,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: "*".to_string(),
            predicates: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            count_exact: false,
            single: false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_count_exact(&self) -> bool {
        self.count_exact
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.split_whitespace().collect::<Vec<_>>().join("");
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates
            .push(Predicate::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates
            .push(Predicate::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates
            .push(Predicate::Lte(column.to_string(), value.into()));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        self.predicates
            .push(Predicate::In(column.to_string(), values.to_vec()));
        self
    }

    pub fn not_in(mut self, column: &str, values: &[String]) -> Self {
        self.predicates
            .push(Predicate::NotIn(column.to_string(), values.to_vec()));
        self
    }

    pub fn any_ilike(mut self, columns: &[&str], term: &str) -> Self {
        self.predicates.push(Predicate::AnyIlike(
            columns.iter().map(|c| c.to_string()).collect(),
            term.to_string(),
        ));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), false));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), true));
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Ask the backend for the exact total row count alongside the page.
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Expect exactly one row; zero rows is reported as a "no rows" error.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Query-string pairs in a stable order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.predicates.iter().map(Predicate::to_pair));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(col, asc)| format!("{col}.{}", if *asc { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Pairs for filter-only requests (update/delete).
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.predicates.iter().map(Predicate::to_pair).collect()
    }

    /// Encoded query string; doubles as the cache key suffix.
    pub fn query_string(&self) -> String {
        self.pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn cache_key(&self) -> String {
        format!(
            "{}?{}#count={}&single={}",
            self.table,
            self.query_string(),
            self.count_exact,
            self.single
        )
    }
}
