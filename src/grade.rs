use std::fmt;

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Grade {
    AA,
    A,
    B,
    Inedible,
}

/// Checked in order, so `GRADE_AA` has to come before its own prefix `GRADE_A`.
const GRADE_PREFIXES: [(&str, Grade); 4] = [
    ("GRADE_AA", Grade::AA),
    ("GRADE_A", Grade::A),
    ("GRADE_B", Grade::B),
    ("GRADE_INEDIBLE", Grade::Inedible),
];

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::AA, Grade::A, Grade::B, Grade::Inedible];

    /// Case-insensitive, whitespace-tolerant prefix match of one command line.  `None` means the
    /// line isn't a grade command.
    pub fn parse(line: &str) -> Option<Grade> {
        let normalized = line.trim().to_uppercase();
        GRADE_PREFIXES
            .iter()
            .find(|(prefix, _)| normalized.starts_with(prefix))
            .map(|(_, grade)| *grade)
    }

    pub fn command(self) -> &'static str {
        match self {
            Grade::AA => "GRADE_AA",
            Grade::A => "GRADE_A",
            Grade::B => "GRADE_B",
            Grade::Inedible => "GRADE_INEDIBLE",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}
