/// Finished hypotheses for one input, ranked by length-normalized score.
#[derive(Debug, Clone)]
pub struct BeamHypotheses {
    num_beams: usize,
    length_penalty: f32,
    beams: Vec<(f32, Vec<u32>)>,
    worst_score: f32,
}

impl BeamHypotheses {
    pub fn new(num_beams: usize, length_penalty: f32) -> Self {
        Self {
            num_beams,
            length_penalty,
            beams: Vec::with_capacity(num_beams + 1),
            worst_score: f32::INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    fn normalize(&self, sum_logprobs: f32, len: usize) -> f32 {
        sum_logprobs / (len.max(1) as f32).powf(self.length_penalty)
    }

    pub fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32) {
        let score = self.normalize(sum_logprobs, tokens.len());
        if self.beams.len() < self.num_beams || score > self.worst_score {
            self.beams.push((score, tokens));
            if self.beams.len() > self.num_beams {
                let worst = self
                    .beams
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                    .map(|(idx, _)| idx);
                if let Some(idx) = worst {
                    self.beams.swap_remove(idx);
                }
            }
            self.worst_score = self
                .beams
                .iter()
                .map(|(s, _)| *s)
                .fold(f32::INFINITY, f32::min);
        }
    }

    /// True once the pool is full and no running beam at `cur_len` can
    /// displace the worst finished one.
    pub fn is_done(&self, best_running_sum_logprobs: f32, cur_len: usize) -> bool {
        if self.beams.len() < self.num_beams {
            return false;
        }
        self.worst_score >= self.normalize(best_running_sum_logprobs, cur_len)
    }

    pub fn best(&self) -> Option<&(f32, Vec<u32>)> {
        self.beams.iter().max_by(|a, b| a.0.total_cmp(&b.0))
    }
}
