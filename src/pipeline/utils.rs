/// String similarity and normalization utilities for header matching
pub struct StringUtils;

impl StringUtils {
    /// Similarity ratio in 0..=100 based on insertion/deletion edit distance.
    ///
    /// `100 * (len_a + len_b - distance) / (len_a + len_b)`, rounded to the
    /// nearest integer. Identical strings (including two empty strings)
    /// score 100.
    pub fn similarity_ratio(s1: &str, s2: &str) -> u8 {
        if s1 == s2 {
            return 100;
        }

        let total = s1.chars().count() + s2.chars().count();
        if total == 0 {
            return 100;
        }

        let distance = Self::indel_distance(s1, s2);
        let ratio = 100.0 * (total - distance) as f64 / total as f64;
        ratio.round() as u8
    }

    /// Edit distance counting only insertions and deletions, so a
    /// substitution costs 2. Equal to `len_a + len_b - 2 * lcs(a, b)`.
    fn indel_distance(s1: &str, s2: &str) -> usize {
        let chars1: Vec<char> = s1.chars().collect();
        let chars2: Vec<char> = s2.chars().collect();
        let len1 = chars1.len();
        let len2 = chars2.len();

        let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

        for (i, row) in matrix.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=len2 {
            matrix[0][j] = j;
        }

        for i in 1..=len1 {
            for j in 1..=len2 {
                matrix[i][j] = if chars1[i - 1] == chars2[j - 1] {
                    matrix[i - 1][j - 1]
                } else {
                    (matrix[i - 1][j] + 1).min(matrix[i][j - 1] + 1)
                };
            }
        }

        matrix[len1][len2]
    }

    /// Normalize a raw header cell for matching: trim, drop `#` and line
    /// breaks, collapse whitespace runs to `_`, lowercase.
    pub fn clean_column_name(name: &str) -> String {
        name.trim()
            .replace(['#', '\n', '\r'], "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
    }
}
