//! Draw outcomes - single pull, ten-pull and the 300-pull tenjou run

use serde::Serialize;

use crate::domain::entities::Character;
use crate::domain::value_objects::DrawTier;

/// One pull
#[derive(Debug, Clone, Serialize)]
pub struct DrawResult {
    pub character: Character,
    pub tier: DrawTier,
    /// Raw currency of the tier: 100 / 50 / 10 / 1
    pub currency: u32,
}

impl DrawResult {
    pub fn new(character: Character, tier: DrawTier) -> Self {
        Self {
            character,
            tier,
            currency: tier.currency(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.tier == DrawTier::Up
    }

    /// Currency as the ten-pull total counts it: UP hits are worth an
    /// ordinary 3-star
    pub fn ten_draw_currency(&self) -> u32 {
        if self.is_up() {
            DrawTier::Star3.currency()
        } else {
            self.currency
        }
    }
}

/// Ten pulls, the last one with the 3-star floor
#[derive(Debug, Clone, Serialize)]
pub struct TenDrawResult {
    pub draws: Vec<DrawResult>,
    /// Sum of `ten_draw_currency` over all pulls
    pub currency: u32,
}

impl TenDrawResult {
    pub fn new(draws: Vec<DrawResult>) -> Self {
        let currency = draws.iter().map(DrawResult::ten_draw_currency).sum();
        Self { draws, currency }
    }
}

/// Aggregate of a full pity-ceiling run
#[derive(Debug, Clone, Serialize)]
pub struct TenjouResult {
    /// UP hits in pull order
    pub up: Vec<Character>,
    /// Ordinary (non-UP) 3-star hits
    pub star3: Vec<Character>,
    pub star2: Vec<Character>,
    pub star1: Vec<Character>,
    /// 1-based pull index of the first UP hit, `NOT_FOUND` if none
    pub first_up_position: u32,
    pub up_count: u32,
    /// Sum of raw currency, UP counted as 100
    pub currency: u32,
    /// Tier of every pull, in order
    #[serde(skip)]
    pub tiers: Vec<DrawTier>,
}

impl TenjouResult {
    pub const NOT_FOUND: u32 = 999;

    pub fn new() -> Self {
        Self {
            up: Vec::new(),
            star3: Vec::new(),
            star2: Vec::new(),
            star1: Vec::new(),
            first_up_position: Self::NOT_FOUND,
            up_count: 0,
            currency: 0,
            tiers: Vec::new(),
        }
    }

    /// Fold one pull into the aggregate
    pub fn record(&mut self, draw: DrawResult) {
        self.tiers.push(draw.tier);
        self.currency += draw.currency;
        match draw.tier {
            DrawTier::Up => {
                self.up_count += 1;
                if self.first_up_position == Self::NOT_FOUND {
                    self.first_up_position = self.tiers.len() as u32;
                }
                self.up.push(draw.character);
            }
            DrawTier::Star3 => self.star3.push(draw.character),
            DrawTier::Star2 => self.star2.push(draw.character),
            DrawTier::Star1 => self.star1.push(draw.character),
        }
    }

    pub fn pulls(&self) -> usize {
        self.tiers.len()
    }

    pub fn first_up(&self) -> Option<u32> {
        (self.first_up_position != Self::NOT_FOUND).then_some(self.first_up_position)
    }
}

impl Default for TenjouResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::CharaId;

    fn draw(name: &str, tier: DrawTier) -> DrawResult {
        DrawResult::new(Character::new(CharaId::from("1001"), name, tier.stars()), tier)
    }

    #[test]
    fn test_ten_draw_counts_up_as_three_star() {
        let mut draws = vec![draw("A", DrawTier::Up)];
        draws.extend((0..8).map(|_| draw("D", DrawTier::Star1)));
        draws.push(draw("C", DrawTier::Star2));
        let result = TenDrawResult::new(draws);
        assert_eq!(result.currency, 50 + 8 + 10);
        assert_eq!(result.draws.len(), 10);
    }

    #[test]
    fn test_tenjou_record() {
        let mut result = TenjouResult::new();
        assert_eq!(result.first_up(), None);

        result.record(draw("D", DrawTier::Star1));
        result.record(draw("B", DrawTier::Star3));
        result.record(draw("A", DrawTier::Up));
        result.record(draw("A", DrawTier::Up));

        assert_eq!(result.first_up(), Some(3));
        assert_eq!(result.up_count, 2);
        assert_eq!(result.currency, 1 + 50 + 100 + 100);
        assert_eq!(result.star3.len(), 1);
        assert_eq!(result.up.len(), 2);
        assert_eq!(result.pulls(), 4);
    }
}
