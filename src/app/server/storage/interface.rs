pub mod game;
pub mod lobby;
pub mod round;
pub mod stats;

pub trait StorageInterface:
    lobby::LobbyInterface + game::GameInterface + round::RoundInterface + stats::StatsInterface
{
}
