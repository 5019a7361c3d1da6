use rand::Rng;
use std::ops::RangeInclusive;

/// Outcome of one pass through the device loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub publish: bool,
    pub finished: bool,
}

/// Counter-based schedule: a reading goes out every `publish_every` passes and
/// the loop ends once it has run more than `max_ticks` passes (`0` never ends).
#[derive(Debug, Clone)]
pub struct SensorSchedule {
    publish_every: u32,
    max_ticks: u32,
    counter: u32,
    loop_counter: u32,
}

impl SensorSchedule {
    pub fn new(publish_every: u32, max_ticks: u32) -> Self {
        Self {
            publish_every: publish_every.max(1),
            max_ticks,
            counter: 0,
            loop_counter: 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        let publish = self.counter >= self.publish_every;
        if publish {
            self.counter = 0;
        }

        self.counter += 1;
        self.loop_counter += 1;

        Tick {
            publish,
            finished: self.max_ticks > 0 && self.loop_counter > self.max_ticks,
        }
    }

    pub fn passes(&self) -> u32 {
        self.loop_counter
    }
}

pub struct SimulatedSensor {
    range: RangeInclusive<i32>,
}

impl SimulatedSensor {
    pub fn new(min: i32, max: i32) -> Self {
        Self { range: min..=max }
    }

    pub fn read(&self) -> i32 {
        rand::rng().random_range(self.range.clone())
    }
}
