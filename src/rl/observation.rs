use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::game::{GameInstance, Heading, RelativeAction};

/// Number of features in an observation
pub const OBSERVATION_SIZE: usize = 11;

/// Feature vector the agent sees for one instance
///
/// Layout:
/// - 0..3: danger straight / right / left, relative to the heading
/// - 3..7: heading one-hot (left, right, up, down)
/// - 7..11: food is left / right / above / below the head
pub type Observation = [f32; OBSERVATION_SIZE];

/// Build the observation for an instance
pub fn observe(instance: &GameInstance) -> Observation {
    let head = instance.head();
    let heading = instance.heading();
    let food = instance.food();

    let danger = |action: RelativeAction| {
        let cell = head.moved_in(heading.rotate(action));
        flag(instance.is_collision(Some(cell)))
    };

    [
        danger(RelativeAction::Forward),
        danger(RelativeAction::TurnRight),
        danger(RelativeAction::TurnLeft),
        flag(heading == Heading::Left),
        flag(heading == Heading::Right),
        flag(heading == Heading::Up),
        flag(heading == Heading::Down),
        flag(food.x < head.x),
        flag(food.x > head.x),
        flag(food.y < head.y),
        flag(food.y > head.y),
    ]
}

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Stack observations into a `[batch, 11]` tensor
pub fn observations_to_tensor<'a, B, I>(observations: I, device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
    I: IntoIterator<Item = &'a Observation>,
{
    let mut data = Vec::new();
    let mut rows = 0;
    for observation in observations {
        data.extend_from_slice(observation);
        rows += 1;
    }

    Tensor::from_data(TensorData::new(data, [rows, OBSERVATION_SIZE]), device)
}
